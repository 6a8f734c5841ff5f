//! Picking a catalog entry from what the operator typed.

use device_deck_core::command_definitions::CommandTemplate;
use device_deck_core::error::Error::CommandNotFound;
use device_deck_core::error::{Error, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::cmp::Reverse;

/// Finds the template named by `selector`.
///
/// A number selects by position in the catalog. Anything else is compared to
/// the template names: an exact, case-insensitive match wins, otherwise the
/// best fuzzy match against either the name or the command template is taken
/// (the earliest one on a tie).
///
/// # Errors
///
/// Returns an error if the index is out of range or nothing matches.
pub fn find_template<'a>(
    catalog: &'a [CommandTemplate],
    selector: &str,
) -> Result<&'a CommandTemplate> {
    let selector = selector.trim();

    if let Ok(index) = selector.parse::<usize>() {
        return catalog
            .get(index)
            .ok_or_else(|| Error::Misc(format!("Command index out of range: {index}!")));
    }

    let lowercase = selector.to_lowercase();
    if let Some(template) = catalog
        .iter()
        .find(|template| template.name.to_lowercase() == lowercase)
    {
        return Ok(template);
    }

    let matcher = SkimMatcherV2::default();
    catalog
        .iter()
        .filter_map(|template| {
            let by_name = matcher.fuzzy_match(&template.name, selector);
            let by_command = matcher.fuzzy_match(&template.template, selector);
            by_name.max(by_command).map(|score| (score, template))
        })
        .min_by_key(|(score, _)| Reverse(*score))
        .map(|(_, template)| template)
        .ok_or_else(|| CommandNotFound(selector.to_string()))
}
