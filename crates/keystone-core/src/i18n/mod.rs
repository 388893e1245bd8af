//! Localized messages.
//!
//! Every message rendered to a caller is looked up by a stable code such as
//! `ERR:USER_NOT_FOUND` or `VAL:REQUIRED`. Lookups never fail: a missing
//! locale falls back to [`DEFAULT_LOCALE`] and a missing code is returned as-is.

mod catalog;
mod locale;

use std::sync::LazyLock;

pub use catalog::{Catalog, format_message};
pub use locale::{DEFAULT_LOCALE, Locale, UnknownLocale};

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| Catalog::new(catalog::MESSAGES));

/// The process-wide message catalog.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

/// Translate `code` into `locale`, substituting `args` positionally.
pub fn translate(code: &str, locale: Locale, args: &[String]) -> String {
    CATALOG.translate(code, locale, args)
}

/// Localized label for a request field, keyed as `FIELD:<NAME>`.
///
/// Fields without a label entry are shown by their raw name.
pub fn field_label(field: &str, locale: Locale) -> String {
    let code = format!("FIELD:{}", field.to_uppercase());
    if CATALOG.contains(&code) {
        CATALOG.translate(&code, locale, &[])
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_in_both_locales() {
        assert_eq!(translate("ERR:SESSION_UNAUTHORIZED", Locale::EnUs, &[]), "Unauthorized access");
        assert_eq!(translate("ERR:SESSION_UNAUTHORIZED", Locale::TrTr, &[]), "Yetkisiz erişim");
    }

    #[test]
    fn test_args_are_substituted() {
        assert_eq!(
            translate("ERR:USER_NOT_FOUND", Locale::EnUs, &["7".to_string()]),
            "User with ID 7 not found"
        );
    }

    #[test]
    fn test_unknown_code_round_trips() {
        assert_eq!(translate("ERR:HTTP_418", Locale::EnUs, &[]), "ERR:HTTP_418");
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(field_label("email", Locale::EnUs), "Email");
        assert_eq!(field_label("email", Locale::TrTr), "E-posta");
        assert_eq!(field_label("nickname", Locale::EnUs), "nickname");
    }
}
