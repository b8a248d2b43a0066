//! Parser for the text printed by `krunvm list`.
//!
//! The listing has no explicit structure. Each VM is a line at column zero,
//! followed by indented `Key: value` detail lines:
//!
//! ```text
//! vortex-builder
//!  CPUs: 2
//!  RAM (MiB): 1024
//!  DNS server: 1.1.1.1
//!  Buildah container: alpine-working-container
//!  Workdir: /
//!  Mapped volumes: {}
//!  Mapped ports: {}
//! ```
//!
//! Some tool versions print detail labels at column zero too, so a table of
//! known labels is consulted before a line is taken as a VM name. A VM that is
//! literally named like one of those labels is indistinguishable from one and
//! will not be listed.

/// Detail labels printed by krunvm that are never VM names.
pub const KNOWN_HEADINGS: &[&str] = &[
    "CPUs",
    "RAM",
    "RAM (MiB)",
    "DNS server",
    "Buildah container",
    "Workdir",
    "Mapped volumes",
    "Mapped ports",
];

/// Set of literals that mark a column-zero line as a detail heading.
///
/// A trimmed line matches an entry when it equals it exactly or is a labelled
/// field of it (`CPUs: 2` matches `CPUs`). Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingTable {
    literals: Vec<String>,
}

impl Default for HeadingTable {
    fn default() -> Self {
        Self {
            literals: KNOWN_HEADINGS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl HeadingTable {
    /// An empty table: every non-indented line is a record.
    pub fn empty() -> Self {
        Self {
            literals: Vec::new(),
        }
    }

    /// The default table plus `extra` literals.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for literal in extra {
            let literal = literal.into();
            if !table.literals.contains(&literal) {
                table.literals.push(literal);
            }
        }
        table
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    pub fn matches(&self, trimmed: &str) -> bool {
        self.literals.iter().any(|literal| {
            trimmed
                .strip_prefix(literal.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
        })
    }
}

/// How a single listing line is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// Indented line belonging to the preceding record.
    Detail,
    /// Column-zero line matching the heading table.
    Heading,
    Record,
}

/// One line of the listing, line terminator removed, indentation kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    text: &'a str,
}

impl<'a> RawLine<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            text: line.strip_suffix('\r').unwrap_or(line),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    pub fn is_indented(&self) -> bool {
        self.text.starts_with(char::is_whitespace)
    }

    pub fn classify(&self, headings: &HeadingTable) -> LineKind {
        let trimmed = self.trimmed();
        if trimmed.is_empty() {
            LineKind::Blank
        } else if self.is_indented() {
            LineKind::Detail
        } else if headings.matches(trimmed) {
            LineKind::Heading
        } else {
            LineKind::Record
        }
    }
}

/// Split listing text into lines.
pub fn lines(text: &str) -> impl Iterator<Item = RawLine<'_>> {
    text.split('\n').map(RawLine::new)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmRecord {
    pub name: String,
}

impl VmRecord {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Parse with the default heading table.
pub fn parse(text: &str) -> Vec<VmRecord> {
    parse_with(text, &HeadingTable::default())
}

/// Records in first-seen order, no deduplication.
pub fn parse_with(text: &str, headings: &HeadingTable) -> Vec<VmRecord> {
    lines(text)
        .filter(|line| line.classify(headings) == LineKind::Record)
        .map(|line| VmRecord {
            name: line.trimmed().to_string(),
        })
        .collect()
}

// ── Detailed listing ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub key: String,
    pub value: String,
}

/// A record together with the `Key: value` lines that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmDetails {
    pub name: String,
    pub fields: Vec<DetailField>,
}

impl VmDetails {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn cpus(&self) -> Option<u32> {
        self.field("CPUs").and_then(|v| leading_number(v))
    }

    /// Memory in MiB, from `RAM (MiB)` or a plain `RAM` field such as `1024MB`.
    pub fn ram_mib(&self) -> Option<u64> {
        self.field("RAM (MiB)")
            .or_else(|| self.field("RAM"))
            .and_then(|v| leading_number(v))
    }

    /// Base image, guessed from the buildah working container name.
    pub fn image_hint(&self) -> Option<&'static str> {
        let container = self.field("Buildah container")?;
        if container.contains("alpine-working-container") {
            Some("alpine")
        } else if container.contains("ubuntu-working-container") {
            Some("ubuntu")
        } else {
            None
        }
    }
}

fn leading_number<T: std::str::FromStr>(value: &str) -> Option<T> {
    let value = value.trim();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Like [`parse_with`], but keeps each record's detail fields.
///
/// Detail and heading lines attach to the most recent record; any that come
/// before the first record are dropped. Lines without a `:` carry no field.
pub fn parse_detailed(text: &str, headings: &HeadingTable) -> Vec<VmDetails> {
    let mut out: Vec<VmDetails> = Vec::new();
    for line in lines(text) {
        match line.classify(headings) {
            LineKind::Blank => {}
            LineKind::Record => out.push(VmDetails {
                name: line.trimmed().to_string(),
                fields: Vec::new(),
            }),
            LineKind::Detail | LineKind::Heading => {
                let Some(current) = out.last_mut() else {
                    continue;
                };
                if let Some((key, value)) = line.trimmed().split_once(':') {
                    let key = key.trim();
                    if !key.is_empty() {
                        current.fields.push(DetailField {
                            key: key.to_string(),
                            value: value.trim().to_string(),
                        });
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SCENARIO_A: &str = include_str!("../tests/fixtures/scenario_a.txt");

    const KRUNVM_LISTING: &str = "\
vortex-ws-1a2b
 CPUs: 2
 RAM (MiB): 2048
 DNS server: 1.1.1.1
 Buildah container: alpine-working-container-3
 Workdir: /workspace
 Mapped volumes: {\"/home/me/src\": \"/workspace\"}
 Mapped ports: {\"8080\": \"80\"}

scratch
 CPUs: 1
 RAM (MiB): 512
 DNS server: 1.1.1.1
 Buildah container: ubuntu-working-container
 Workdir: /
 Mapped volumes: {}
 Mapped ports: {}
";

    fn names(records: &[VmRecord]) -> Vec<&str> {
        records.iter().map(VmRecord::name).collect()
    }

    #[test]
    fn scenario_a_records() {
        assert_eq!(
            names(&parse(SCENARIO_A)),
            ["vortex-builder", "vortex-test-env", "other-vm"]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn heading_only_input_yields_nothing() {
        assert!(parse("RAM\n").is_empty());
        assert!(parse("CPUs: 2\nRAM (MiB): 512\nWorkdir: /\nMapped ports: {}\n").is_empty());
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(parse(KRUNVM_LISTING), parse(KRUNVM_LISTING));
    }

    #[test]
    fn real_listing_format() {
        assert_eq!(names(&parse(KRUNVM_LISTING)), ["vortex-ws-1a2b", "scratch"]);
    }

    #[test]
    fn indented_lines_never_become_records() {
        let text = "alpha\n  beta\n\tgamma\n delta-vm\nepsilon\n";
        assert_eq!(names(&parse(text)), ["alpha", "epsilon"]);
    }

    #[test]
    fn each_heading_literal_is_excluded() {
        for heading in KNOWN_HEADINGS {
            assert!(parse(heading).is_empty(), "{heading} parsed as record");
        }
    }

    #[test]
    fn heading_match_is_case_sensitive_and_anchored() {
        // `ram-disk` and `cpus` are not headings.
        assert_eq!(names(&parse("ram-disk\ncpus\nRAMBO\n")), ["ram-disk", "cpus", "RAMBO"]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        assert_eq!(names(&parse("one\r\n  CPUs: 1\r\ntwo\r\n")), ["one", "two"]);
    }

    #[test]
    fn order_preserved_and_duplicates_kept() {
        assert_eq!(names(&parse("b\na\nb\n")), ["b", "a", "b"]);
    }

    #[test]
    fn output_is_ordered_subsequence_of_nonblank_lines() {
        let nonblank: Vec<&str> = KRUNVM_LISTING
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let mut rest = nonblank.iter();
        for record in parse(KRUNVM_LISTING) {
            assert!(rest.any(|l| *l == record.name));
        }
    }

    #[test]
    fn extra_headings_extend_table() {
        let table = HeadingTable::with_extra(["Status"]);
        assert_eq!(names(&parse_with("vm1\nStatus: running\n", &table)), ["vm1"]);
        assert_eq!(names(&parse("vm1\nStatus: running\n")), ["vm1", "Status: running"]);
    }

    #[test]
    fn empty_table_keeps_every_column_zero_line() {
        let table = HeadingTable::empty();
        assert_eq!(names(&parse_with("RAM\nvm\n", &table)), ["RAM", "vm"]);
    }

    #[test]
    fn classify_lines() {
        let table = HeadingTable::default();
        assert_eq!(RawLine::new("  ").classify(&table), LineKind::Blank);
        assert_eq!(RawLine::new(" CPUs: 2").classify(&table), LineKind::Detail);
        assert_eq!(RawLine::new("Workdir: /").classify(&table), LineKind::Heading);
        assert_eq!(RawLine::new("vortex-a").classify(&table), LineKind::Record);
    }

    #[test]
    fn detailed_listing_collects_fields() {
        let vms = parse_detailed(KRUNVM_LISTING, &HeadingTable::default());
        assert_eq!(vms.len(), 2);

        assert_eq!(vms[0].name, "vortex-ws-1a2b");
        assert_eq!(vms[0].cpus(), Some(2));
        assert_eq!(vms[0].ram_mib(), Some(2048));
        assert_eq!(vms[0].image_hint(), Some("alpine"));
        assert_eq!(vms[0].field("Workdir"), Some("/workspace"));

        assert_eq!(vms[1].name, "scratch");
        assert_eq!(vms[1].cpus(), Some(1));
        assert_eq!(vms[1].image_hint(), Some("ubuntu"));
    }

    #[test]
    fn detailed_listing_reads_plain_ram_with_unit() {
        let vms = parse_detailed(SCENARIO_A, &HeadingTable::default());
        assert_eq!(vms[0].ram_mib(), Some(1024));
        assert_eq!(vms[1].cpus(), Some(4));
        assert_eq!(vms[1].ram_mib(), None);
        assert!(vms[2].fields.is_empty());
    }

    #[test]
    fn detailed_names_match_plain_parse() {
        let plain: Vec<String> = parse(KRUNVM_LISTING).into_iter().map(|r| r.name).collect();
        let detailed: Vec<String> = parse_detailed(KRUNVM_LISTING, &HeadingTable::default())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(plain, detailed);
    }

    #[test]
    fn column_zero_heading_attaches_to_previous_record() {
        let vms = parse_detailed("vm\nCPUs: 8\n", &HeadingTable::default());
        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].cpus(), Some(8));
    }

    #[test]
    fn details_before_first_record_are_dropped() {
        let vms = parse_detailed(" CPUs: 2\nvm\n", &HeadingTable::default());
        assert_eq!(vms.len(), 1);
        assert!(vms[0].fields.is_empty());
    }
}
