//! Tiered banned-term moderation
//!
//! User text is screened against three tiers of literal terms, checked in
//! ascending severity order. Every occurrence of a matched term is replaced
//! with a mask of identical character length, so the layout of the composed
//! poster is unaffected by redaction.

use self::Severity::{Commercial, Political, Vulgar};

/// Banned-term category, checked and masked in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Tier 1: politically sensitive, illegal or violent content
    Political,
    /// Tier 2: vulgar or derogatory language
    Vulgar,
    /// Tier 3: commercial solicitation
    Commercial,
}

impl Severity {
    /// All tiers in checking order
    pub const ALL: [Severity; 3] = [Political, Vulgar, Commercial];

    /// Human-readable warning shown when this tier matched
    pub fn warning(&self) -> &'static str {
        match self {
            Political => "Contains politically sensitive or inappropriate content; it has been filtered",
            Vulgar => "Contains vulgar language; it has been filtered",
            Commercial => "Contains commercial solicitation; it has been filtered",
        }
    }
}

/// Match counts per severity tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub political: usize,
    pub vulgar: usize,
    pub commercial: usize,
}

impl TierCounts {
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Political => self.political,
            Vulgar => self.vulgar,
            Commercial => self.commercial,
        }
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Political => self.political += 1,
            Vulgar => self.vulgar += 1,
            Commercial => self.commercial += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.political + self.vulgar + self.commercial
    }
}

/// A matched banned term together with the tier that caught it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub term: String,
    pub severity: Severity,
}

/// Outcome of running text through the moderation engine.
///
/// Immutable once produced; regenerate it whenever the input changes.
#[derive(Debug, Clone)]
pub struct ModerationResult {
    pub original_text: String,
    pub filtered_text: String,
    pub matches: Vec<TermMatch>,
    pub stats: TierCounts,
}

impl ModerationResult {
    pub fn has_filtered_words(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Result of validating text for interactive input
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub filtered_text: String,
    pub warnings: Vec<String>,
    pub stats: TierCounts,
}

/// Aggregate match statistics for a piece of text
#[derive(Debug, Clone)]
pub struct FilterStats {
    pub total: usize,
    pub by_severity: TierCounts,
    pub matches: Vec<TermMatch>,
}

/// Result of a pure length check; no moderation applied
#[derive(Debug, Clone, Copy)]
pub struct LengthCheck {
    pub is_valid: bool,
    pub current_length: usize,
    pub max_length: usize,
    pub remaining: i64,
}

/// An ordered collection of banned-term tiers
#[derive(Debug, Clone)]
pub struct BannedTermSet {
    tiers: Vec<(Severity, Vec<String>)>,
}

impl BannedTermSet {
    /// Build a term set from explicit tier lists (checked in the given order)
    pub fn new(tiers: Vec<(Severity, Vec<String>)>) -> Self {
        Self { tiers }
    }

    /// The production term set for the campaign
    pub fn campaign_default() -> Self {
        let collect = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect();
        Self::new(vec![
            (Political, collect(POLITICAL_TERMS)),
            (Vulgar, collect(VULGAR_TERMS)),
            (Commercial, collect(COMMERCIAL_TERMS)),
        ])
    }

    pub fn tiers(&self) -> &[(Severity, Vec<String>)] {
        &self.tiers
    }
}

/// Mask character used for redaction
const MASK: char = '*';

/// Moderation engine over a fixed banned-term set.
///
/// Construct one per page session; the term set is immutable for the
/// engine's lifetime.
#[derive(Debug, Clone)]
pub struct ModerationEngine {
    terms: BannedTermSet,
}

impl ModerationEngine {
    pub fn new() -> Self {
        Self {
            terms: BannedTermSet::campaign_default(),
        }
    }

    pub fn with_terms(terms: BannedTermSet) -> Self {
        Self { terms }
    }

    /// Screen `text` against every tier and redact matched terms.
    ///
    /// Tiers are processed in ascending severity order, term by term. A term
    /// is recorded once when it occurs anywhere in the text as it stands at
    /// that point, then every occurrence is replaced with a `*` mask of the
    /// same character length. A term that begins with the mask character can
    /// therefore still match against earlier redactions; that edge case is
    /// accepted.
    pub fn moderate(&self, text: &str) -> ModerationResult {
        if text.is_empty() {
            return ModerationResult {
                original_text: text.to_string(),
                filtered_text: text.to_string(),
                matches: Vec::new(),
                stats: TierCounts::default(),
            };
        }

        let mut filtered = text.to_string();
        let mut matches = Vec::new();
        let mut stats = TierCounts::default();

        for (severity, terms) in self.terms.tiers() {
            for term in terms {
                if filtered.contains(term.as_str()) {
                    matches.push(TermMatch {
                        term: term.clone(),
                        severity: *severity,
                    });
                    stats.bump(*severity);

                    let mask: String = std::iter::repeat(MASK).take(term.chars().count()).collect();
                    filtered = filtered.replace(term.as_str(), &mask);
                }
            }
        }

        ModerationResult {
            original_text: text.to_string(),
            filtered_text: filtered,
            matches,
            stats,
        }
    }

    /// Validate interactive input: moderate it and attach one warning per
    /// severity tier that had at least one match.
    pub fn validate(&self, text: &str) -> ValidationReport {
        let result = self.moderate(text);

        let warnings = Severity::ALL
            .iter()
            .filter(|severity| result.stats.count(**severity) > 0)
            .map(|severity| severity.warning().to_string())
            .collect();

        ValidationReport {
            is_valid: !result.has_filtered_words(),
            filtered_text: result.filtered_text,
            warnings,
            stats: result.stats,
        }
    }

    /// Match statistics for `text`, discarding the redacted copy.
    pub fn stats(&self, text: &str) -> FilterStats {
        let result = self.moderate(text);
        FilterStats {
            total: result.matches.len(),
            by_severity: result.stats,
            matches: result.matches,
        }
    }

    /// Check text length in characters against a maximum. No moderation.
    pub fn check_length(&self, text: &str, max_length: usize) -> LengthCheck {
        let current = text.chars().count();
        LengthCheck {
            is_valid: current <= max_length,
            current_length: current,
            max_length,
            remaining: max_length as i64 - current as i64,
        }
    }
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Tier 1: politically sensitive, illegal and violent content
const POLITICAL_TERMS: &[&str] = &[
    "台獨", "統一", "一中", "九二共識", "垂死政權",
    "小英", "阿扁", "馬英九", "蔡英文", "賴清德", "柯文哲", "韓國瑜",
    "民進黨", "國民黨", "時代力量", "台灣民眾黨",
    "統獨", "藍綠", "泛藍", "泛綠",
    "反中", "親中", "舔共", "支那",
    "毒品", "大麻", "海洛因", "安非他命", "搖頭丸", "K他命",
    "吸毒", "販毒", "毒販", "嗨藥",
    "賭博", "六合彩", "地下錢莊", "詐騙", "洗錢", "地下匯兌",
    "殺人", "殺死", "自殺", "自殘", "尋死",
    "強姦", "性侵", "猥褻", "色情", "A片", "裸體",
    "恐嚇", "威脅", "幹掉", "搞死",
];

// Tier 2: vulgar and derogatory language
const VULGAR_TERMS: &[&str] = &[
    "媽的", "他媽的", "去死",
    "白癡", "白痴", "智障", "腦殘", "北七", "神經病",
    "王八蛋", "混蛋", "渾蛋", "廢物", "垃圾",
    "婊子", "賤人", "機掰", "雞掰",
    "大便", "吃屎", "狗屎",
    "妓女", "做雞", "召妓", "買春",
    "小三", "劈腿", "綠帽",
    "三八", "低能", "弱智",
    "肥豬", "死胖子", "醜八怪",
    "幹你", "幹林娘", "幹恁娘", "趕羚羊",
    "靠北", "靠腰", "靠杯", "機歪", "白目",
    "龜兒子", "王八",
    "死囝仔", "死查某", "肖查某",
];

// Tier 3: commercial solicitation
const COMMERCIAL_TERMS: &[&str] = &[
    "加LINE", "LINE群", "私訊", "密我", "+LINE",
    "http", "www", ".com", ".tw", ".net",
    "投資", "賺錢", "獲利", "被動收入", "理財",
    "股票", "期貨", "外匯", "虛擬幣", "比特幣",
    "貸款", "借錢", "信貸", "車貸", "房貸",
    "直銷", "傳銷", "下線", "微商", "代購", "團購",
    "優惠", "折扣", "特價", "促銷", "限時", "免費",
    "試用", "體驗", "諮詢", "預約",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_identity() {
        let engine = ModerationEngine::new();
        let result = engine.moderate("");
        assert!(!result.has_filtered_words());
        assert_eq!(result.filtered_text, "");
        assert_eq!(result.stats.total(), 0);
    }

    #[test]
    fn clean_text_passes_through() {
        let engine = ModerationEngine::new();
        let result = engine.moderate("恭喜入圍金鐘獎");
        assert!(!result.has_filtered_words());
        assert_eq!(result.filtered_text, "恭喜入圍金鐘獎");
    }

    #[test]
    fn mask_has_same_char_length_as_term() {
        let engine = ModerationEngine::new();
        let result = engine.moderate("大家一起投資賺錢");
        assert!(result.has_filtered_words());
        // each matched term is two characters, masked as two asterisks
        assert_eq!(result.filtered_text, "大家一起****");
        assert_eq!(result.stats.commercial, 2);
        assert_eq!(
            result.filtered_text.chars().count(),
            result.original_text.chars().count()
        );
    }

    #[test]
    fn every_occurrence_is_masked() {
        let engine = ModerationEngine::new();
        let result = engine.moderate("投資！還是投資！");
        assert_eq!(result.filtered_text, "**！還是**！");
        // one recorded match per term, not per occurrence
        assert_eq!(result.stats.commercial, 1);
    }

    #[test]
    fn mixed_tier_scenario_reports_per_tier_counts() {
        let engine = ModerationEngine::new();
        let result = engine.moderate("幹你這個垂死政權");
        assert!(result.stats.political >= 1);
        assert!(result.stats.vulgar >= 1);
        assert_eq!(result.stats.commercial, 0);
        assert!(!result.filtered_text.contains("垂死政權"));
        assert!(!result.filtered_text.contains("幹你"));
    }

    #[test]
    fn moderation_is_idempotent() {
        let engine = ModerationEngine::new();
        let first = engine.moderate("這裡有毒品和投資機會");
        assert!(first.has_filtered_words());
        let second = engine.moderate(&first.filtered_text);
        assert!(!second.has_filtered_words());
        assert_eq!(second.filtered_text, first.filtered_text);
    }

    #[test]
    fn validate_emits_one_warning_per_tier() {
        let engine = ModerationEngine::new();
        let report = engine.validate("這個智障都在詐騙直銷");
        assert!(!report.is_valid);
        assert_eq!(report.warnings.len(), 3);

        let clean = engine.validate("金鐘六十，星光閃耀");
        assert!(clean.is_valid);
        assert!(clean.warnings.is_empty());
    }

    #[test]
    fn stats_summarizes_matches() {
        let engine = ModerationEngine::new();
        let stats = engine.stats("投資賺錢");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_severity.commercial, 2);
        assert_eq!(stats.matches.len(), 2);
    }

    #[test]
    fn check_length_counts_chars_not_bytes() {
        let engine = ModerationEngine::new();
        let check = engine.check_length("金鐘六十", 50);
        assert!(check.is_valid);
        assert_eq!(check.current_length, 4);
        assert_eq!(check.remaining, 46);

        let over = engine.check_length(&"字".repeat(51), 50);
        assert!(!over.is_valid);
        assert_eq!(over.remaining, -1);
    }
}
