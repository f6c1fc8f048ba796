//! Summary entry to output row projection
//!
//! Each output table is fed by entries carrying one coverage indicator field:
//! `famcvg` for families, `phycvg` for phyla and `vircvg` for sequences. The
//! projections return `None` when an entry lacks a field the row cannot be
//! built without; such entries are skipped, not reported.

use crate::summary::SummaryRecord;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Built-in phylum code to name table
pub const BUILTIN_PHYLUM_NAMES: &[(&str, &str)] = &[
    ("dupl", "Duplornaviricota"),
    ("kiti", "Kitrinoviricota"),
    ("levi", "Lenarviricota"),
    ("nega", "Negarnaviricota"),
    ("pisu", "Pisuviricota"),
    ("rdrp", "Unclassified"),
    ("var", "Deltavirus"),
];

/// A flat output row: ordered `(column, value)` pairs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputRow {
    fields: Vec<(String, String)>,
}

impl OutputRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column in place
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Value of `column`, if present
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<C: Into<String>, V: Into<String>> FromIterator<(C, V)> for OutputRow {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        let mut row = OutputRow::new();
        for (c, v) in iter {
            row.push(c, v);
        }
        row
    }
}

/// The three output tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// Family-level coverage
    Family,
    /// Phylum-level coverage
    Phylum,
    /// Sequence-level coverage
    Sequence,
}

impl RowKind {
    /// All kinds, in output order
    pub const ALL: [RowKind; 3] = [RowKind::Family, RowKind::Phylum, RowKind::Sequence];

    /// Field whose presence marks an entry as belonging to this table
    pub fn coverage_field(self) -> &'static str {
        match self {
            RowKind::Family => "famcvg",
            RowKind::Phylum => "phycvg",
            RowKind::Sequence => "vircvg",
        }
    }

    /// Whether `record` belongs to this table
    pub fn matches(self, record: &SummaryRecord) -> bool {
        record.has(self.coverage_field())
    }

    /// Project `record` into a row of this table
    pub fn project(self, record: &SummaryRecord, names: &PhylumNames) -> Option<OutputRow> {
        match self {
            RowKind::Family => family_row(record, names),
            RowKind::Phylum => phylum_row(record, names),
            RowKind::Sequence => sequence_row(record, names),
        }
    }
}

/// How phylum codes are rendered in output rows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PhylumNames {
    /// Keep the raw code (e.g. `pisu`)
    #[default]
    Code,
    /// Resolve codes through a lookup table; unknown codes stay as-is
    Lookup(HashMap<String, String>),
}

impl PhylumNames {
    /// Lookup through [`BUILTIN_PHYLUM_NAMES`]
    pub fn builtin() -> Self {
        PhylumNames::Lookup(
            BUILTIN_PHYLUM_NAMES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        )
    }

    /// Lookup loaded from a JSON object file (`{"code": "name", ...}`)
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::config(
                "phylum_names",
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let table: HashMap<String, String> = serde_json::from_slice(&bytes)?;
        Ok(PhylumNames::Lookup(table))
    }

    /// Render `code`
    pub fn resolve<'a>(&'a self, code: &'a str) -> &'a str {
        match self {
            PhylumNames::Code => code,
            PhylumNames::Lookup(table) => table.get(code).map(String::as_str).unwrap_or(code),
        }
    }
}

/// Family name derived from a family group label
///
/// `Unc...` groups become `Unclassified-...`; other groups are cut at their
/// first `-`.
pub fn family_name(group: &str) -> String {
    match group.strip_prefix("Unc") {
        Some(rest) => format!("Unclassified-{}", rest),
        None => group.split('-').next().unwrap_or(group).to_string(),
    }
}

/// Row for the family table; requires `fam` shaped `<phylum>.<group>`
pub fn family_row(record: &SummaryRecord, names: &PhylumNames) -> Option<OutputRow> {
    let mut parts = record.get("fam")?.split('.');
    let phylum = parts.next()?;
    let group = parts.next()?;

    let mut row = OutputRow::new()
        .with("run_id", field(record, "sra"))
        .with("phylum_name", names.resolve(phylum))
        .with("family_name", family_name(group))
        .with("family_group", group);
    push_metrics(&mut row, record, "famcvg");
    Some(row)
}

/// Row for the phylum table; requires `phy`
pub fn phylum_row(record: &SummaryRecord, names: &PhylumNames) -> Option<OutputRow> {
    let phylum = record.get("phy")?;

    let mut row = OutputRow::new()
        .with("run_id", field(record, "sra"))
        .with("phylum_name", names.resolve(phylum));
    push_metrics(&mut row, record, "phycvg");
    Some(row)
}

/// Row for the sequence table; requires `vir` shaped
/// `<phylum>.<group>.<virus>[:<accession>]`
///
/// Only the dot-separated third part names the virus, so an accession
/// version suffix (`AB123.1`) is not carried into the row.
pub fn sequence_row(record: &SummaryRecord, names: &PhylumNames) -> Option<OutputRow> {
    let mut parts = record.get("vir")?.split('.');
    let phylum = parts.next()?;
    let group = parts.next()?;
    let mut name = parts.next()?.split(':');
    let virus = name.next().unwrap_or_default();
    let accession = name.next().unwrap_or_default();

    let mut row = OutputRow::new()
        .with("run_id", field(record, "sra"))
        .with("phylum_name", names.resolve(phylum))
        .with("family_name", family_name(group))
        .with("family_group", group)
        .with("virus_name", virus)
        .with("sequence_accession", accession);
    push_metrics(&mut row, record, "vircvg");
    Some(row)
}

fn field<'a>(record: &'a SummaryRecord, name: &str) -> &'a str {
    record.get(name).unwrap_or_default()
}

/// Coverage and alignment columns shared by every table
fn push_metrics(row: &mut OutputRow, record: &SummaryRecord, coverage: &str) {
    row.push("coverage_bins", field(record, coverage));
    row.push("score", field(record, "score"));
    row.push("percent_identity", field(record, "pctid"));
    row.push("depth", field(record, "depth"));
    row.push("n_reads", field(record, "alns"));
    row.push("aligned_length", field(record, "avgcols"));
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::parse_summary;

    fn entry(line: &str) -> SummaryRecord {
        parse_summary(line).remove(0)
    }

    #[test]
    fn family_row_has_expected_columns() {
        let record = entry(
            "sra=SRR1;fam=pisu.Picorna-7;famcvg=_o_O;score=90;pctid=88;depth=3.2;alns=40;avgcols=120",
        );
        let row = family_row(&record, &PhylumNames::Code).unwrap();

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(
            columns,
            vec![
                "run_id",
                "phylum_name",
                "family_name",
                "family_group",
                "coverage_bins",
                "score",
                "percent_identity",
                "depth",
                "n_reads",
                "aligned_length",
            ]
        );
        let values: Vec<&str> = row.values().collect();
        assert_eq!(
            values,
            vec![
                "SRR1", "pisu", "Picorna", "Picorna-7", "_o_O", "90", "88", "3.2", "40", "120"
            ]
        );
    }

    #[test]
    fn unclassified_groups_are_expanded() {
        assert_eq!(family_name("Unc12"), "Unclassified-12");
        assert_eq!(family_name("Narna-3"), "Narna");
        assert_eq!(family_name("Tombus"), "Tombus");
    }

    #[test]
    fn phylum_names_resolve_through_lookup() {
        let record = entry("sra=SRR2;phy=kiti;phycvg=oO");

        let coded = phylum_row(&record, &PhylumNames::Code).unwrap();
        assert_eq!(coded.get("phylum_name"), Some("kiti"));

        let named = phylum_row(&record, &PhylumNames::builtin()).unwrap();
        assert_eq!(named.get("phylum_name"), Some("Kitrinoviricota"));
        assert_eq!(named.len(), 8);

        let unknown = entry("sra=SRR2;phy=zzz;phycvg=oO");
        let row = phylum_row(&unknown, &PhylumNames::builtin()).unwrap();
        assert_eq!(row.get("phylum_name"), Some("zzz"));
    }

    #[test]
    fn sequence_row_splits_virus_and_accession() {
        let record = entry("sra=SRR3;vir=nega.Unc4.Orthomyxo:AB123.1;vircvg=_O;score=5");
        let row = sequence_row(&record, &PhylumNames::builtin()).unwrap();

        assert_eq!(row.get("phylum_name"), Some("Negarnaviricota"));
        assert_eq!(row.get("family_name"), Some("Unclassified-4"));
        assert_eq!(row.get("family_group"), Some("Unc4"));
        assert_eq!(row.get("virus_name"), Some("Orthomyxo"));
        assert_eq!(row.get("sequence_accession"), Some("AB123"));
        assert_eq!(row.get("coverage_bins"), Some("_O"));
        assert_eq!(row.get("depth"), Some(""), "missing metrics are empty cells");
        assert_eq!(row.len(), 12);
    }

    #[test]
    fn malformed_classification_yields_no_row() {
        assert!(family_row(&entry("famcvg=o;fam=nodot"), &PhylumNames::Code).is_none());
        assert!(family_row(&entry("famcvg=o"), &PhylumNames::Code).is_none());
        assert!(phylum_row(&entry("phycvg=o"), &PhylumNames::Code).is_none());
        assert!(sequence_row(&entry("vircvg=o;vir=a.b"), &PhylumNames::Code).is_none());

        let row = sequence_row(&entry("vircvg=o;vir=a.b.noaccession"), &PhylumNames::Code).unwrap();
        assert_eq!(row.get("virus_name"), Some("noaccession"));
        assert_eq!(row.get("sequence_accession"), Some(""));
    }

    #[test]
    fn row_kind_routes_by_coverage_field() {
        let record = entry("sra=S;fam=pisu.X;famcvg=o;phy=pisu;phycvg=o");

        let kinds: Vec<RowKind> = RowKind::ALL
            .into_iter()
            .filter(|kind| kind.matches(&record))
            .collect();
        assert_eq!(kinds, vec![RowKind::Family, RowKind::Phylum]);
        assert!(RowKind::Family.project(&record, &PhylumNames::Code).is_some());
    }

    #[tokio::test]
    async fn dictionary_file_is_loaded() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"pisu": "Pisuviricota", "obli": "Obliviviridae"}"#)
            .unwrap();

        let names = PhylumNames::from_json_file(file.path()).await.unwrap();
        assert_eq!(names.resolve("obli"), "Obliviviridae");
        assert_eq!(names.resolve("kiti"), "kiti");
    }

    #[tokio::test]
    async fn missing_dictionary_file_is_a_config_error() {
        let result = PhylumNames::from_json_file(Path::new("/no/such/dictionary.json")).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
