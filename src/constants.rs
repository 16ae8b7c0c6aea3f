use once_cell::sync::Lazy;

/// Column name constants for the source CSV to ensure consistency across the codebase.

// Fixed columns
pub const AGENCY_COLUMN: &str = "조사기관";
pub const DATE_COLUMN: &str = "조사일자";

/// A tracked party: the raw CSV header it appears under and the canonical
/// display name used as the aggregation key.
///
/// Two of the source headers carry embedded newlines (a formatting artifact
/// of the published table); their display names are the newline-free forms.
#[derive(Debug, Clone, Copy)]
pub struct PartyColumn {
    pub csv_name: &'static str,
    pub display_name: &'static str,
}

/// Catalog of tracked party columns, in source-table order.
pub static PARTY_COLUMNS: Lazy<Vec<PartyColumn>> = Lazy::new(|| {
    vec![
        PartyColumn { csv_name: "더불어민주당", display_name: "더불어민주당" },
        PartyColumn { csv_name: "국민의힘", display_name: "국민의힘" },
        PartyColumn { csv_name: "조국혁신당", display_name: "조국혁신당" },
        PartyColumn { csv_name: "개혁신당", display_name: "개혁신당" },
        PartyColumn { csv_name: "진보당", display_name: "진보당" },
        PartyColumn { csv_name: "기타정당", display_name: "기타정당" },
        PartyColumn { csv_name: "지지정당\n없음", display_name: "지지정당 없음" },
        PartyColumn { csv_name: "모름/\n무응답", display_name: "모름/무응답" },
    ]
});

/// Default file locations, overridable via config.toml or CLI flags.
pub const DEFAULT_INPUT_CSV: &str = "data/party.csv";
pub const DEFAULT_DB_PATH: &str = "data/polltrack.db";
pub const DEFAULT_OUTPUT_DIR: &str = "public/data";

/// Name of the exported JSON document inside the output directory.
pub const EXPORT_FILE_NAME: &str = "party-support.json";
