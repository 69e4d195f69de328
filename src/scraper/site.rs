//! Everything the results site expects or emits.
//!
//! Field names and text markers are an unversioned contract with the
//! third-party page. When its markup changes, this is the file to edit.

pub const DEFAULT_URL: &str = "https://www-s.websysinfo.uqam.ca/etudiant/drew00da";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/39.0.2171.36 Safari/537.36";

// POST fields
pub const FIELD_CODE: &str = "owa_cd_perm";
pub const FIELD_NIP: &str = "owa_cpa";
pub const FIELD_CLASS: &str = "owa_sigle";
pub const FIELD_GROUP: &str = "owa_groupe";
pub const FIELD_YEAR: &str = "owa_annee";

/// Header text preceding every error message.
pub const WARNING_MARKER: &str = "ATTENTION";

/// No-results message shown under the warning header.
pub const NO_RESULTS_MARKER: &str = "ne sont pas disponibles via";

/// No-results message of the second page variant, which has no warning header.
pub const NO_RESULTS_UNWARNED_MARKER: &str = "valuation n'est diffu";

pub const INVALID_CLASS_MARKER: &str = "Session/sigle/groupe inexistant";

pub const INVALID_CREDENTIALS_MARKER: &str = "Code permanent inexistant ou NIP non valide";

pub const NOT_REGISTERED_MARKER: &str = "pas inscrit";

/// The results table is the `<table>` carrying `name="form"`.
pub const RESULTS_TABLE_ATTR: (&str, &str) = ("name", "form");

/// Title, header, total and final-grade rows carry a background color;
/// graded items don't.
pub const META_ROW_ATTR: &str = "bgcolor";

/// Leading cell of the row the site appends once the course is complete.
pub const FINAL_GRADE_LABEL: &str = "Note finale";

/// Substituted for every column the current layout does not provide.
pub const NOT_AVAILABLE: &str = "N/A";
