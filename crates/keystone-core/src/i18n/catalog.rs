use std::collections::HashMap;

use super::locale::{DEFAULT_LOCALE, Locale};

type Entry = &'static [(Locale, &'static str)];

/// Read-only table of message templates keyed by code.
#[derive(Debug)]
pub struct Catalog {
    entries: HashMap<&'static str, Entry>,
}

impl Catalog {
    pub fn new(entries: &[(&'static str, Entry)]) -> Self {
        Catalog {
            entries: entries.iter().copied().collect(),
        }
    }

    /// Resolve `code` for `locale`.
    ///
    /// Falls back to the default locale, then to the code itself.
    pub fn translate(&self, code: &str, locale: Locale, args: &[String]) -> String {
        let Some(entry) = self.entries.get(code) else {
            return code.to_string();
        };

        let template = lookup(entry, locale).or_else(|| lookup(entry, DEFAULT_LOCALE));
        match template {
            Some(template) => format_message(template, args),
            None => code.to_string(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Whether `code` has an entry for exactly `locale` (no fallback).
    pub fn has_entry(&self, code: &str, locale: Locale) -> bool {
        self.entries
            .get(code)
            .is_some_and(|entry| lookup(entry, locale).is_some())
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

fn lookup(entry: Entry, locale: Locale) -> Option<&'static str> {
    entry
        .iter()
        .find(|(l, _)| *l == locale)
        .map(|(_, template)| *template)
}

/// Positional substitution: each `%v` takes the next argument, `%%` is a
/// literal percent sign. A `%v` with no argument left stays as-is and extra
/// arguments are ignored.
pub fn format_message(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('v') => {
                chars.next();
                match args.next() {
                    Some(arg) => out.push_str(arg),
                    None => out.push_str("%v"),
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    out
}

use Locale::{EnUs, TrTr};

pub(super) const MESSAGES: &[(&str, Entry)] = &[
    // Generic
    ("ERR:INTERNAL_SERVER_ERROR", &[(EnUs, "Something went wrong"), (TrTr, "Bir şeyler ters gitti")]),
    ("ERR:INVALID_REQUEST_PAYLOAD", &[(EnUs, "Invalid request payload"), (TrTr, "Geçersiz istek verisi")]),
    ("ERR:INVALID_ID", &[(EnUs, "Invalid user ID"), (TrTr, "Geçersiz kullanıcı ID'si")]),

    // Framework-level HTTP errors
    ("ERR:HTTP_400", &[(EnUs, "Bad request"), (TrTr, "Geçersiz istek")]),
    ("ERR:HTTP_404", &[(EnUs, "Resource not found"), (TrTr, "Kaynak bulunamadı")]),
    ("ERR:HTTP_405", &[(EnUs, "Method not allowed"), (TrTr, "İzin verilmeyen yöntem")]),
    ("ERR:HTTP_408", &[(EnUs, "Request timed out"), (TrTr, "İstek zaman aşımına uğradı")]),
    ("ERR:HTTP_413", &[(EnUs, "Request body too large"), (TrTr, "İstek gövdesi çok büyük")]),
    ("ERR:HTTP_415", &[(EnUs, "Unsupported media type"), (TrTr, "Desteklenmeyen ortam türü")]),

    // Session
    ("ERR:SESSION_COOKIE_NOT_FOUND", &[(EnUs, "Session cookie not found"), (TrTr, "Oturum çerezi bulunamadı")]),
    ("ERR:SESSION_EMPTY_ID", &[(EnUs, "Empty session ID"), (TrTr, "Boş oturum ID'si")]),
    ("ERR:SESSION_NOT_FOUND", &[(EnUs, "Session expired or not found"), (TrTr, "Oturum süresi dolmuş veya bulunamadı")]),
    ("ERR:SESSION_GENERATE_ID", &[(EnUs, "Failed to generate session ID"), (TrTr, "Oturum ID'si oluşturulamadı")]),
    ("ERR:SESSION_SERIALIZATION", &[(EnUs, "Failed to serialize user data"), (TrTr, "Kullanıcı verisi serileştirilemedi")]),
    ("ERR:SESSION_STORE", &[(EnUs, "Failed to store session in cache"), (TrTr, "Oturum önbelleğe kaydedilemedi")]),
    ("ERR:SESSION_CHECK_EXIST", &[(EnUs, "Failed to check session existence"), (TrTr, "Oturum varlığı kontrol edilemedi")]),
    ("ERR:SESSION_REFRESH", &[(EnUs, "Failed to refresh session expiry"), (TrTr, "Oturum süresi yenilenemedi")]),
    ("ERR:SESSION_DESERIALIZE", &[(EnUs, "Failed to deserialize user data"), (TrTr, "Kullanıcı verisi çözümlenemedi")]),
    ("ERR:SESSION_UNAUTHORIZED", &[(EnUs, "Unauthorized access"), (TrTr, "Yetkisiz erişim")]),

    // Users
    ("ERR:USER_NOT_FOUND", &[(EnUs, "User with ID %v not found"), (TrTr, "ID'si %v olan kullanıcı bulunamadı")]),
    ("ERR:USER_ALREADY_EXISTS", &[(EnUs, "User already exists"), (TrTr, "Kullanıcı zaten kayıtlı")]),
    ("ERR:USER_EMAIL_ALREADY_EXISTS", &[
        (EnUs, "A user with that email already exists"),
        (TrTr, "Bu e-posta adresine sahip bir kullanıcı zaten kayıtlı"),
    ]),

    // Success
    ("SUCC:USER_CREATED", &[(EnUs, "User created successfully"), (TrTr, "Kullanıcı başarıyla oluşturuldu")]),
    ("SUCC:USER_UPDATED", &[(EnUs, "User updated successfully"), (TrTr, "Kullanıcı başarıyla güncellendi")]),
    ("SUCC:USER_DELETED", &[(EnUs, "User deleted successfully"), (TrTr, "Kullanıcı başarıyla silindi")]),
    ("SUCC:LOGIN_SUCCESS", &[(EnUs, "Login successful"), (TrTr, "Giriş başarılı")]),
    ("SUCC:LOGOUT_SUCCESS", &[(EnUs, "Logout successful"), (TrTr, "Çıkış başarılı")]),
    ("SUCC:SESSION_REFRESHED", &[(EnUs, "Session refreshed"), (TrTr, "Oturum yenilendi")]),

    // Validation
    ("VAL:VALIDATION_ERR", &[(EnUs, "Validation failed"), (TrTr, "Doğrulama hatası")]),
    ("VAL:REQUIRED", &[(EnUs, "%v is required"), (TrTr, "%v alanı zorunludur")]),
    ("VAL:EMAIL", &[(EnUs, "%v must be a valid email address"), (TrTr, "%v geçerli bir e-posta adresi olmalıdır")]),
    ("VAL:PHONE", &[
        (EnUs, "%v must be a valid phone number (+905XXXXXXXXX)"),
        (TrTr, "%v geçerli bir telefon numarası olmalıdır (+905XXXXXXXXX)"),
    ]),
    ("VAL:ALPHA", &[(EnUs, "%v may only contain letters"), (TrTr, "%v yalnızca harf içerebilir")]),
    ("VAL:ALPHANUM", &[(EnUs, "%v may only contain letters and digits"), (TrTr, "%v yalnızca harf ve rakam içerebilir")]),
    ("VAL:CONTAINS", &[(EnUs, "%v must contain '%v'"), (TrTr, "%v '%v' içermelidir")]),
    ("VAL:ONEOF", &[(EnUs, "%v must be one of: %v"), (TrTr, "%v şunlardan biri olmalıdır: %v")]),
    ("VAL:MIN_STRING", &[(EnUs, "%v must be at least %v characters long"), (TrTr, "%v en az %v karakter olmalıdır")]),
    ("VAL:MIN_SLICE", &[(EnUs, "%v must contain at least %v items"), (TrTr, "%v en az %v öğe içermelidir")]),
    ("VAL:MIN_NUMBER", &[(EnUs, "%v must be at least %v"), (TrTr, "%v en az %v olmalıdır")]),
    ("VAL:GTE_NUMBER", &[
        (EnUs, "%v must be greater than or equal to %v"),
        (TrTr, "%v, %v değerine eşit veya daha büyük olmalıdır"),
    ]),
    ("VAL:MAX_STRING", &[(EnUs, "%v must be at most %v characters long"), (TrTr, "%v en fazla %v karakter olmalıdır")]),
    ("VAL:MAX_SLICE", &[(EnUs, "%v must contain at most %v items"), (TrTr, "%v en fazla %v öğe içermelidir")]),
    ("VAL:MAX_NUMBER", &[(EnUs, "%v must be at most %v"), (TrTr, "%v en fazla %v olmalıdır")]),
    ("VAL:LTE_NUMBER", &[
        (EnUs, "%v must be less than or equal to %v"),
        (TrTr, "%v, %v değerine eşit veya daha küçük olmalıdır"),
    ]),
    ("VAL:LEN_STRING", &[(EnUs, "%v must be exactly %v characters long"), (TrTr, "%v tam olarak %v karakter olmalıdır")]),
    ("VAL:LEN_SLICE", &[(EnUs, "%v must contain exactly %v items"), (TrTr, "%v tam olarak %v öğe içermelidir")]),
    ("VAL:LEN_NUMBER", &[(EnUs, "%v must be equal to %v"), (TrTr, "%v, %v değerine eşit olmalıdır")]),
    ("VAL:UNKNOWN", &[
        (EnUs, "%v failed an unhandled validation rule: %v"),
        (TrTr, "%v işlenmeyen bir doğrulama kuralına takıldı: %v"),
    ]),

    // Field labels
    ("FIELD:NAME", &[(EnUs, "Name"), (TrTr, "Ad")]),
    ("FIELD:EMAIL", &[(EnUs, "Email"), (TrTr, "E-posta")]),
    ("FIELD:PASSWORD", &[(EnUs, "Password"), (TrTr, "Şifre")]),
    ("FIELD:PHONE", &[(EnUs, "Phone"), (TrTr, "Telefon")]),
    ("FIELD:ROLE", &[(EnUs, "Role"), (TrTr, "Rol")]),
];
