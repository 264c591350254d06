/// Extracts structured questions from a completion's numbered question blocks
///
/// Each block is judged on its own: a malformed block becomes a `Rejected`
/// outcome and the remaining blocks are still returned.
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::QuizQuestion;

const OPTION_LABELS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    Parsed(QuizQuestion),
    Rejected { index: usize, reason: String },
}

/// Per-block results of one completion
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub outcomes: Vec<BlockOutcome>,
}

impl ParseReport {
    pub fn accepted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BlockOutcome::Parsed(_)))
            .count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BlockOutcome::Rejected { index, reason } => Some((*index, reason.as_str())),
            BlockOutcome::Parsed(_) => None,
        })
    }

    pub fn into_questions(self) -> Vec<QuizQuestion> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                BlockOutcome::Parsed(question) => Some(question),
                BlockOutcome::Rejected { .. } => None,
            })
            .collect()
    }
}

fn block_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\n\d+\.\s").expect("valid block marker regex"))
}

fn option_line() -> &'static Regex {
    static OPTION: OnceLock<Regex> = OnceLock::new();
    OPTION.get_or_init(|| Regex::new(r"^([a-d])\)\s(.+?)(\*?)$").expect("valid option regex"))
}

pub fn parse_question_blocks(text: &str) -> ParseReport {
    let normalized = format!("\n{}", text.trim().replace("\r\n", "\n"));
    let outcomes = block_marker()
        .split(&normalized)
        .skip(1)
        .enumerate()
        .map(|(index, block)| match parse_block(block) {
            Ok(question) => BlockOutcome::Parsed(question),
            Err(reason) => BlockOutcome::Rejected { index, reason },
        })
        .collect();

    ParseReport { outcomes }
}

fn value_after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, value)| value.trim()).unwrap_or("")
}

fn parse_block(block: &str) -> Result<QuizQuestion, String> {
    let lines: Vec<&str> = block.trim().lines().collect();
    let prompt = lines.first().map(|l| l.trim()).unwrap_or("");
    if prompt.is_empty() {
        return Err("missing question prompt".to_string());
    }

    let mut options = BTreeMap::new();
    let mut correct = Vec::new();
    for line in &lines {
        if let Some(captures) = option_line().captures(line.trim()) {
            let label = captures[1].to_string();
            if &captures[3] == "*" {
                correct.push(label.clone());
            }
            options.insert(label, captures[2].trim().to_string());
        }
    }

    if let Some(missing) = OPTION_LABELS.iter().find(|label| !options.contains_key(**label)) {
        return Err(format!("missing option {})", missing));
    }
    let correct_label = match correct.as_slice() {
        [label] => label.clone(),
        [] => return Err("no option marked correct".to_string()),
        _ => return Err(format!("{} options marked correct", correct.len())),
    };

    // Marker lines start with their label; the prompt line never counts
    let find_line = |label: &str| {
        lines
            .iter()
            .skip(1)
            .position(|l| l.trim_start().starts_with(label))
            .map(|index| index + 1)
            .ok_or_else(|| format!("missing '{}' line", label))
    };

    let timestamp_index = find_line("Timestamp:")?;
    let seconds_index = find_line("Seconds:")?;
    let url_index = find_line("Watch at:")?;

    let timestamp = value_after_colon(lines[timestamp_index])
        .trim_matches(|c| c == ' ' || c == '[' || c == ']')
        .to_string();
    let seconds_text = lines[seconds_index].split(':').nth(1).unwrap_or("").trim();
    let timestamp_seconds = seconds_text
        .trim_end_matches('s')
        .parse::<u64>()
        .map_err(|_| format!("unreadable seconds value '{}'", seconds_text))?;
    let source_url = value_after_colon(lines[url_index]).to_string();
    if source_url.is_empty() {
        return Err("empty watch URL".to_string());
    }

    let explanation = lines[url_index + 1..].join("\n");
    let explanation = explanation.trim();
    let explanation = ["Explanation:", "Explaination:"]
        .iter()
        .find_map(|label| explanation.strip_prefix(label))
        .unwrap_or(explanation)
        .trim()
        .to_string();

    Ok(QuizQuestion {
        prompt: prompt.to_string(),
        options,
        correct_label,
        timestamp,
        timestamp_seconds,
        source_url,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Here are your questions:\n\
        1. What causes tides?\n\
        a) Wind\n\
        b) The Moon's gravity*\n\
        c) Earthquakes\n\
        d) Ocean currents\n\
        Timestamp: [00:01:30,000]\n\
        Seconds: 90\n\
        Watch at: https://youtu.be/k4oWqYT6tjk?t=90s\n\
        Explanation: The Moon's gravitational pull\n\
        raises the water on the near side.\n\
        \n\
        2. Which planet is largest?\n\
        a) Mars\n\
        b) Venus\n\
        c) Jupiter *\n\
        d) Earth\n\
        Timestamp: 00:02:05,500\n\
        Seconds: 125\n\
        Watch at: https://youtu.be/k4oWqYT6tjk?t=125s\n\
        Jupiter is the largest planet.";

    #[test]
    fn test_parses_well_formed_blocks() {
        let report = parse_question_blocks(WELL_FORMED);
        assert_eq!(report.accepted_count(), 2);

        let questions = report.into_questions();
        let first = &questions[0];
        assert_eq!(first.prompt, "What causes tides?");
        assert_eq!(first.correct_label, "b");
        assert_eq!(first.correct_option(), Some("The Moon's gravity"));
        assert_eq!(first.timestamp, "00:01:30,000");
        assert_eq!(first.timestamp_seconds, 90);
        assert_eq!(first.source_url, "https://youtu.be/k4oWqYT6tjk?t=90s");
        assert_eq!(
            first.explanation,
            "The Moon's gravitational pull\nraises the water on the near side."
        );

        let second = &questions[1];
        assert_eq!(second.correct_label, "c");
        assert_eq!(second.options["c"], "Jupiter");
        assert_eq!(second.timestamp, "00:02:05,500");
        assert_eq!(second.explanation, "Jupiter is the largest planet.");
    }

    #[test]
    fn test_malformed_block_is_dropped_individually() {
        let text = format!(
            "{}\n\n3. Missing its timestamp?\na) x*\nb) y\nc) z\nd) w\nSeconds: 10\nWatch at: https://youtu.be/x?t=10s\n\n\
             4. Two answers?\na) x*\nb) y*\nc) z\nd) w\nTimestamp: [00:00:01,000]\nSeconds: 1\nWatch at: https://youtu.be/x?t=1s",
            WELL_FORMED
        );
        let report = parse_question_blocks(&text);

        assert_eq!(report.accepted_count(), 2);
        let rejected: Vec<_> = report.rejected().collect();
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].0, 2);
        assert!(rejected[0].1.contains("Timestamp"));
        assert!(rejected[1].1.contains("2 options"));
    }

    #[test]
    fn test_missing_option_or_marker_rejected() {
        let report = parse_question_blocks(
            "1. Three options only?\na) x*\nb) y\nc) z\nTimestamp: 00:00:01,000\nSeconds: 1\nWatch at: u\n\n\
             2. Nothing marked?\na) x\nb) y\nc) z\nd) w\nTimestamp: 00:00:01,000\nSeconds: 1\nWatch at: u",
        );
        assert_eq!(report.accepted_count(), 0);
        let reasons: Vec<_> = report.rejected().map(|(_, r)| r.to_string()).collect();
        assert_eq!(reasons, vec!["missing option d)", "no option marked correct"]);
    }

    #[test]
    fn test_marker_words_inside_text_are_not_markers() {
        let report = parse_question_blocks(
            "1. Which Timestamp format uses Seconds: and Watch at: links?
             a) Plain Seconds: only
             b) SRT with a Timestamp and comma millis*
             c) Watch at: home
             d) None
             Timestamp: [00:00:42,000]
             Seconds: 42
             Watch at: https://youtu.be/k4oWqYT6tjk?t=42s
             Explanation: The Timestamp line uses SRT, the Seconds: line feeds the URL.",
        );

        let questions = report.into_questions();
        assert_eq!(questions.len(), 1);
        let question = &questions[0];
        assert_eq!(question.prompt, "Which Timestamp format uses Seconds: and Watch at: links?");
        assert_eq!(question.correct_label, "b");
        assert_eq!(question.options["c"], "Watch at: home");
        assert_eq!(question.timestamp, "00:00:42,000");
        assert_eq!(question.timestamp_seconds, 42);
        assert_eq!(question.source_url, "https://youtu.be/k4oWqYT6tjk?t=42s");
        assert_eq!(
            question.explanation,
            "The Timestamp line uses SRT, the Seconds: line feeds the URL."
        );
    }

    #[test]
    fn test_text_without_blocks() {
        let report = parse_question_blocks("I cannot generate questions for this video.");
        assert!(report.outcomes.is_empty());
    }
}
