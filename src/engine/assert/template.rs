use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Substitutes `${name}` placeholders from `values`; unknown names stay as written.
pub fn render(template: &str, values: &BTreeMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |captures: &Captures<'_>| {
            match values.get(&captures[1]) {
                Some(value) => value.clone(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}
