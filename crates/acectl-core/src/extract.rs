// ── Log line fact extraction ──
//
// Firmware console lines sometimes announce state changes before the next
// status snapshot does. A small table of patterns turns such lines into
// typed facts; anything unmatched is ignored.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static FILAMENT_POS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ace_filament_pos set to (\w+)").expect("filament position pattern is valid")
});

static ENDLESS_SPOOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Currently enabled: (True|False)").expect("endless spool pattern is valid")
});

static TOOL_LOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tool (-?\d+) load").expect("tool load pattern is valid"));

/// A state change recognized in a console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFact {
    FilamentPosition(String),
    /// Loaded slot; -1 after an unload.
    CurrentSlot(i32),
    /// Endless-spool setting reported by the status command.
    EndlessSpool(bool),
    /// Slot metadata changed; the full status should be pulled.
    ResyncRequested,
}

type Producer = fn(Option<&Captures<'_>>) -> Option<StateFact>;

/// One recognizer: cheap substring pre-filters, an optional capture
/// pattern, and a producer turning the match into a fact.
#[derive(Clone)]
pub struct LogPattern {
    pub name: &'static str,
    needles: Vec<&'static str>,
    regex: Option<Regex>,
    produce: Producer,
}

impl std::fmt::Debug for LogPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPattern")
            .field("name", &self.name)
            .field("needles", &self.needles)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .finish_non_exhaustive()
    }
}

impl LogPattern {
    pub fn new(
        name: &'static str,
        needles: Vec<&'static str>,
        regex: Option<Regex>,
        produce: Producer,
    ) -> Self {
        Self {
            name,
            needles,
            regex,
            produce,
        }
    }

    fn apply(&self, line: &str) -> Option<StateFact> {
        if !self.needles.iter().all(|n| line.contains(n)) {
            return None;
        }
        match self.regex {
            Some(ref re) => {
                let caps = re.captures(line)?;
                (self.produce)(Some(&caps))
            }
            None => (self.produce)(None),
        }
    }
}

/// Ordered pattern table.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    patterns: Vec<LogPattern>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TextExtractor {
    pub fn new(patterns: Vec<LogPattern>) -> Self {
        Self { patterns }
    }

    /// The recognizers for stock ACE firmware output.
    pub fn builtin() -> Self {
        Self::new(vec![
            LogPattern::new("slot-metadata", vec!["Slot", "set:"], None, |_| {
                Some(StateFact::ResyncRequested)
            }),
            LogPattern::new(
                "filament-position",
                vec!["ace_filament_pos set to"],
                Some(FILAMENT_POS_RE.clone()),
                |caps| Some(StateFact::FilamentPosition(caps?.get(1)?.as_str().to_owned())),
            ),
            LogPattern::new(
                "endless-spool",
                vec!["Currently enabled: "],
                Some(ENDLESS_SPOOL_RE.clone()),
                |caps| Some(StateFact::EndlessSpool(caps?.get(1)?.as_str() == "True")),
            ),
            LogPattern::new(
                "tool-load",
                vec!["Tool ", " load"],
                Some(TOOL_LOAD_RE.clone()),
                |caps| {
                    let tool = caps?.get(1)?.as_str().parse().ok()?;
                    Some(StateFact::CurrentSlot(tool))
                },
            ),
        ])
    }

    /// Add a recognizer at the end of the table.
    pub fn push(&mut self, pattern: LogPattern) {
        self.patterns.push(pattern);
    }

    /// Every fact the line yields, in table order.
    pub fn extract(&self, line: &str) -> Vec<StateFact> {
        self.patterns
            .iter()
            .filter_map(|p| {
                let fact = p.apply(line)?;
                tracing::trace!(pattern = p.name, ?fact, "console line matched");
                Some(fact)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filament_position() {
        let facts = TextExtractor::builtin().extract("// ace_filament_pos set to toolhead");
        assert_eq!(facts, vec![StateFact::FilamentPosition("toolhead".into())]);
    }

    #[test]
    fn tool_load_and_unload() {
        let ex = TextExtractor::builtin();
        assert_eq!(ex.extract("Tool 2 load"), vec![StateFact::CurrentSlot(2)]);
        assert_eq!(ex.extract("// Tool -1 load complete"), vec![StateFact::CurrentSlot(-1)]);
    }

    #[test]
    fn slot_metadata_requests_resync() {
        let facts = TextExtractor::builtin().extract("Slot 1 set: color=255,0,0 type=PLA");
        assert_eq!(facts, vec![StateFact::ResyncRequested]);
    }

    #[test]
    fn endless_spool_status_echo() {
        let ex = TextExtractor::builtin();
        assert_eq!(
            ex.extract("// - Currently enabled: True"),
            vec![StateFact::EndlessSpool(true)]
        );
        assert_eq!(
            ex.extract("// - Currently enabled: False"),
            vec![StateFact::EndlessSpool(false)]
        );
        assert!(ex.extract("// - Currently enabled: maybe").is_empty());
    }

    #[test]
    fn near_misses_are_ignored() {
        let ex = TextExtractor::builtin();
        assert!(ex.extract("Tool change requested").is_empty());
        assert!(ex.extract("Tool x load").is_empty());
        assert!(ex.extract("slot 1 set: lowercase").is_empty());
        assert!(ex.extract("ace_filament_pos set to ").is_empty());
        assert!(ex.extract("").is_empty());
    }

    #[test]
    fn custom_patterns_extend_the_table() {
        let mut ex = TextExtractor::builtin();
        ex.push(LogPattern::new("dryer-done", vec!["Drying finished"], None, |_| {
            Some(StateFact::ResyncRequested)
        }));
        assert_eq!(ex.extract("Drying finished"), vec![StateFact::ResyncRequested]);
    }
}
