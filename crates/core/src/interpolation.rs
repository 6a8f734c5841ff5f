use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use leon::Template;

use crate::error::{Error, Result};

/// A run of literal text or a `{name}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn is_name_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_name_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}

/// Splits a template into literal text and placeholders.
///
/// Only `{name}` is a placeholder, where the name starts with a letter or `_`
/// and goes on with letters, digits, `_` or `-`. Every other brace is shell
/// text: `{}`, `{1..3}`, `${HOME}`, an unmatched `{` or `}`.
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut search_from = 0;

    while let Some(offset) = template[search_from..].find('{') {
        let open = search_from + offset;
        let name_start = open + 1;
        let name_end = template[name_start..]
            .find(|character: char| !is_name_char(character))
            .map_or(template.len(), |length| name_start + length);
        let name = &template[name_start..name_end];

        let is_placeholder = name.starts_with(is_name_start)
            && template[name_end..].starts_with('}')
            && !template[..open].ends_with('$');

        if is_placeholder {
            if literal_start < open {
                segments.push(Segment::Text(&template[literal_start..open]));
            }
            segments.push(Segment::Placeholder(name));
            literal_start = name_end + 1;
            search_from = literal_start;
        } else {
            search_from = name_start;
        }
    }

    if literal_start < template.len() {
        segments.push(Segment::Text(&template[literal_start..]));
    }

    segments
}

/// Rewrites a template in leon syntax: literal backslashes and braces are
/// escaped, placeholders are kept.
fn leon_source(template: &str) -> String {
    let mut source = String::with_capacity(template.len() + 8);

    for segment in segments(template) {
        match segment {
            Segment::Text(text) => {
                for character in text.chars() {
                    if matches!(character, '\\' | '{' | '}') {
                        source.push('\\');
                    }
                    source.push(character);
                }
            }
            Segment::Placeholder(name) => {
                source.push('{');
                source.push_str(name);
                source.push('}');
            }
        }
    }

    source
}

/// Find all placeholders of a template, de-duplicated, in order of first occurrence.
///
/// Text that is not a `{name}` placeholder is never an error; it is left as is.
///
/// # Errors
///
/// Returns an error if the template engine rejects the template.
pub fn get_placeholders(template: &str) -> Result<IndexSet<String>> {
    let source = leon_source(template);
    let parsed = Template::parse(&source)?;
    let mut placeholders = IndexSet::new();

    for key in parsed.keys() {
        let key: &str = key;
        let _ = placeholders.insert(key.to_string());
    }

    Ok(placeholders)
}

/// Wraps a value in double quotes so it stays a single shell word.
pub fn quote_value(value: &str) -> String {
    if cfg!(windows) {
        return format!("\"{value}\"");
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for character in value.chars() {
        if matches!(character, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(character);
    }
    quoted.push('"');

    quoted
}

/// Substitutes every `{name}` in the template with its value.
///
/// Values are inserted as given; quoting is the caller's concern.
///
/// # Errors
///
/// Returns [`Error::UnresolvedPlaceholders`] if any placeholder has no value.
pub fn build_command<S: std::hash::BuildHasher>(
    template: &str,
    values: &IndexMap<String, String, S>,
) -> Result<String> {
    let source = leon_source(template);
    let parsed = Template::parse(&source)?;

    let mut missing: IndexSet<String> = IndexSet::new();
    for key in parsed.keys() {
        let key: &str = key;
        if !values.contains_key(key) {
            let _ = missing.insert(key.to_string());
        }
    }

    if !missing.is_empty() {
        return Err(Error::unresolved_placeholders(
            template,
            missing.into_iter().collect(),
        ));
    }

    let lookup: HashMap<String, String> = values
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok(parsed.render(&lookup)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_placeholders_are_deduplicated_in_first_occurrence_order() {
        let placeholders: Vec<String> = get_placeholders("cmd {a} {b} {a}")
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(placeholders, vec!["a", "b"]);
    }

    #[test]
    fn test_placeholders_empty_for_plain_command() {
        assert!(get_placeholders("hdc list targets").unwrap().is_empty());
    }

    fn placeholder_list(template: &str) -> Vec<String> {
        get_placeholders(template).unwrap().into_iter().collect()
    }

    #[test]
    fn test_stray_braces_are_shell_text() {
        assert!(placeholder_list("echo {").is_empty());
        assert!(placeholder_list("echo }").is_empty());
        assert!(placeholder_list("echo { a }").is_empty());
        assert!(placeholder_list("echo file{1..3}").is_empty());
        assert!(placeholder_list("find . -exec ls {} \\;").is_empty());
    }

    #[test]
    fn test_shell_variable_expansion_is_not_a_placeholder() {
        assert_eq!(placeholder_list("cp ${HOME}/a {target}"), vec!["target"]);
    }

    #[test]
    fn test_backslashes_pass_through() {
        assert_eq!(placeholder_list("echo a\\b {x}"), vec!["x"]);
        assert_eq!(
            build_command("echo a\\b {x}", &values(&[("x", "V")])).unwrap(),
            "echo a\\b V"
        );
        assert_eq!(
            build_command("copy C:\\{file} D:\\", &values(&[("file", "\"a.txt\"")])).unwrap(),
            "copy C:\\\"a.txt\" D:\\"
        );
    }

    #[test]
    fn test_build_command_keeps_literal_braces() {
        let command = build_command(
            "find {dir} -name '*.log' -exec rm {} \\; && echo }{",
            &values(&[("dir", "/data")]),
        )
        .unwrap();
        assert_eq!(command, "find /data -name '*.log' -exec rm {} \\; && echo }{");
    }

    #[test]
    fn test_hyphenated_placeholder() {
        assert_eq!(placeholder_list("hdc -t {device-id} shell"), vec!["device-id"]);
    }

    #[test]
    fn test_quote_value_plain_path() {
        assert_eq!(quote_value("/tmp/a.txt"), "\"/tmp/a.txt\"");
        assert_eq!(quote_value("/tmp/my file.txt"), "\"/tmp/my file.txt\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_quote_value_escapes_shell_specials() {
        assert_eq!(quote_value("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_value("$HOME"), "\"\\$HOME\"");
        assert_eq!(quote_value("`id`"), "\"\\`id\\`\"");
    }

    #[test]
    fn test_build_command_substitutes_every_occurrence() {
        let command =
            build_command("echo {a} {b} {a}", &values(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(command, "echo 1 2 1");
    }

    #[test]
    fn test_build_command_with_quoted_values() {
        let command = build_command(
            "push {local_path} {remote_path}",
            &values(&[
                ("local_path", quote_value("/tmp/a.txt").as_str()),
                ("remote_path", quote_value("/sdcard/a.txt").as_str()),
            ]),
        )
        .unwrap();
        assert_eq!(command, "push \"/tmp/a.txt\" \"/sdcard/a.txt\"");
    }

    #[test]
    fn test_build_command_rejects_missing_values() {
        let result = build_command("cmd {a} {b} {c}", &values(&[("b", "x")]));
        match result {
            Err(Error::UnresolvedPlaceholders { placeholders, .. }) => {
                assert_eq!(placeholders, vec!["a", "c"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_build_command_ignores_extra_values() {
        let command = build_command(
            "hdc install {local_path}",
            &values(&[("local_path", "\"app.hap\""), ("remote_path", "\"/data\"")]),
        )
        .unwrap();
        assert_eq!(command, "hdc install \"app.hap\"");
    }
}
