//! Customer-facing message templates with `{name}` placeholders.
//!
//! `{{` and `}}` render as literal braces.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const COD_CONFIRMATION: &str = "Hello {name},\n\n\
Thank you for choosing {storename} 🙌\n\n\
Please confirm your COD order before we proceed:\n\n\
Order ID: {orderID}\n\
Order Value: INR {amount}\n\
Order Items: {product_name}\n\n\
Wishing you a delightful shopping experience 💕";

pub const PROMO_MESSAGE: &str = "Hi {name},\n\n\
Get ₹{discount} off if you confirm your order now!\n\
Order ID: {orderID}\n\
Order Value: INR {amount}\n\
Order Items: {product_name}\n\n\
Hurry, offer valid for a limited time only! 🎉";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing placeholder in data: {0}")]
    MissingPlaceholder(String),
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Names of all placeholders in `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in token_regex().captures_iter(template) {
        if let Some(name) = caps.get(1).map(|m| m.as_str()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

pub fn render(template: &str, data: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !data.contains_key(*name))
    {
        return Err(TemplateError::MissingPlaceholder(missing.to_string()));
    }

    let rendered = token_regex().replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
        Some(name) => data.get(name.as_str()).cloned().unwrap_or_default(),
        None if &caps[0] == "{{" => "{".to_string(),
        None => "}".to_string(),
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn renders_cod_confirmation() {
        let message = render(
            COD_CONFIRMATION,
            &data(&[
                ("name", "Shruti"),
                ("storename", "thecaajustore"),
                ("orderID", "#1855"),
                ("amount", "619.05"),
                ("product_name", "Money Box"),
            ]),
        )
        .expect("render");
        assert!(message.starts_with("Hello Shruti,\n\nThank you for choosing thecaajustore"));
        assert!(message.contains("Order ID: #1855\nOrder Value: INR 619.05\nOrder Items: Money Box\n\n"));
        assert!(!message.contains('{'));
    }

    #[test]
    fn missing_value_names_the_placeholder() {
        let err = render(PROMO_MESSAGE, &data(&[("name", "Shruti"), ("orderID", "#1"), ("amount", "1")]))
            .expect_err("missing");
        assert_eq!(err, TemplateError::MissingPlaceholder("discount".to_string()));
    }

    #[test]
    fn escaped_braces_and_extra_keys() {
        let rendered = render("{{literal}} {a}", &data(&[("a", "x"), ("unused", "y")])).expect("render");
        assert_eq!(rendered, "{literal} x");
        assert_eq!(placeholders(PROMO_MESSAGE), vec!["name", "discount", "orderID", "amount", "product_name"]);
    }
}
