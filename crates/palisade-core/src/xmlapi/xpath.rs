//! Xpath construction helpers.
//!
//! Entry names are restricted to alphanumerics plus `._-` well before
//! they reach an xpath, so quoting with the default `'` is always safe;
//! the quote character is still configurable because some managed
//! devices are provisioned with `"` as the filter quote.

/// Renders an `@attr='value'` predicate with the default quote.
#[must_use]
pub fn xpath_attr(name: &str, value: &str) -> String {
    xpath_attr_quoted(name, value, '\'')
}

/// Renders an `@attr=<q>value<q>` predicate with an explicit quote.
#[must_use]
pub fn xpath_attr_quoted(name: &str, value: &str, quote: char) -> String {
    format!("@{name}={quote}{value}{quote}")
}

/// Builds the fully qualified xpath of an entry collection or a single
/// entry, quoting with the default `'`.
///
/// `prefix` comes from [`crate::location::Location::xpath_prefix`],
/// `suffix` is the resource's path under the location (for example
/// `["address"]`), and `name` selects a single entry when present.
#[must_use]
pub fn entry_xpath(prefix: &str, suffix: &[&str], name: Option<&str>) -> String {
    entry_xpath_quoted(prefix, suffix, name, '\'')
}

/// [`entry_xpath`] with an explicit quote character.
#[must_use]
pub fn entry_xpath_quoted(
    prefix: &str,
    suffix: &[&str],
    name: Option<&str>,
    quote: char,
) -> String {
    let mut xpath = String::from(prefix);
    for part in suffix {
        xpath.push('/');
        xpath.push_str(part);
    }
    if let Some(name) = name {
        xpath.push_str("/entry[");
        xpath.push_str(&xpath_attr_quoted("name", name, quote));
        xpath.push(']');
    }
    xpath
}
