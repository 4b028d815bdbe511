//! SQL utility functions

/// Quote an identifier for interpolation into a statement
///
/// Wraps the name in double quotes and doubles any embedded quote, so the
/// result is always a single identifier token regardless of content.
///
/// # Example
///
/// ```
/// use basalt_server::utils::sql::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a schema-qualified relation name (`"schema"."name"`)
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quote a string literal (standard_conforming_strings semantics)
///
/// ```
/// use basalt_server::utils::sql::quote_literal;
///
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_plain() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
    }

    #[test]
    fn test_quote_ident_keeps_case_and_dash() {
        assert_eq!(quote_ident("Order-Items"), "\"Order-Items\"");
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"; DROP TABLE x; --"), "\"a\"\"; DROP TABLE x; --\"");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("public", "users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_quote_literal_empty() {
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_quote_literal_multiple_quotes() {
        assert_eq!(quote_literal("'';--"), "''''';--'");
    }
}
