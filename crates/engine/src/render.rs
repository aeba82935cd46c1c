//! Placeholder substitution for campaign message personalization.

use dispatch_core::types::Contact;

/// Personalization tokens and their field accessors. Adding a token here is
/// all that is needed to support a new `{{...}}` placeholder.
const TOKENS: &[(&str, fn(&Contact) -> &str)] = &[
    ("first_name", |c| &c.first_name),
    ("last_name", |c| &c.last_name),
    ("email", |c| &c.email),
    ("company", |c| &c.company),
];

/// Replace every literal `{{token}}` occurrence with the contact's field
/// value. Replacement is global and non-recursive; empty fields render as
/// the empty string rather than the literal token. Unknown tokens and
/// unterminated braces pass through untouched.
pub fn render_template(text: &str, contact: &Contact) -> String {
    // Single left-to-right pass so substituted values are never rescanned.
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let token = &after[..end];
                match TOKENS.iter().find(|(name, _)| *name == token) {
                    Some((_, accessor)) => out.push_str(accessor(contact)),
                    None => {
                        out.push_str("{{");
                        out.push_str(token);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
