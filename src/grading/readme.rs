//! Results section of a student README

use super::grades::{GradeRecord, Score};

pub const RESULTS_HEADING: &str = "## Résultats";
/// Last line of the section; marks where a previous section ends
pub const RESULTS_SENTINEL: &str = "[Voir détails](./logs/tests_results.txt) | [Rafraîchir](../../)";

/// Render the results table, heading through sentinel, without a trailing newline
pub fn results_section(grades: &[GradeRecord]) -> String {
    let mut lines = vec![
        RESULTS_HEADING.to_string(),
        "Score | Critères".to_string(),
        "--- | ---".to_string(),
    ];
    for grade in grades {
        let earned = if grade.passing { grade.points } else { 0 };
        lines.push(format!("{}/{} | {}", earned, grade.points, grade.test_name));
    }
    lines.push(format!("{} | **Total**", Score::of(grades)));
    lines.push(String::new());
    lines.push(RESULTS_SENTINEL.to_string());
    lines.join("\n")
}

/// Put the results section into `readme`.
///
/// An existing section (heading through sentinel) is replaced in place.
/// Otherwise the section goes before the first markdown heading, or at the
/// top when there is none. Splicing the same grades twice gives the same
/// text.
pub fn splice_readme(readme: &str, grades: &[GradeRecord]) -> String {
    let section = results_section(grades);
    let lines: Vec<&str> = readme.lines().collect();
    let trailing_newline = readme.ends_with('\n');

    let start = lines.iter().position(|l| l.trim_end() == RESULTS_HEADING);
    let end = start.and_then(|s| {
        lines[s..]
            .iter()
            .position(|l| l.contains(RESULTS_SENTINEL))
            .map(|offset| s + offset)
    });

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + grades.len() + 8);
    match (start, end) {
        (Some(start), Some(end)) => {
            out.extend(lines[..start].iter().map(|l| l.to_string()));
            out.push(section);
            out.extend(lines[end + 1..].iter().map(|l| l.to_string()));
        }
        _ => {
            let insert_at = lines
                .iter()
                .position(|l| l.trim_start().starts_with('#'))
                .unwrap_or(0);
            out.extend(lines[..insert_at].iter().map(|l| l.to_string()));
            out.push(section);
            out.push(String::new());
            out.extend(lines[insert_at..].iter().map(|l| l.to_string()));
        }
    }

    let mut text = out.join("\n");
    if trailing_newline || readme.is_empty() {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grades() -> Vec<GradeRecord> {
        vec![
            GradeRecord {
                func_name: "test_sum".into(),
                passing: true,
                test_name: "Somme".into(),
                points: 2,
            },
            GradeRecord {
                func_name: "test_max".into(),
                passing: false,
                test_name: "Maximum".into(),
                points: 3,
            },
        ]
    }

    #[test]
    fn test_results_section_rows() {
        let section = results_section(&grades());
        let lines: Vec<&str> = section.lines().collect();
        assert_eq!(lines[0], "## Résultats");
        assert_eq!(lines[1], "Score | Critères");
        assert_eq!(lines[3], "2/2 | Somme");
        assert_eq!(lines[4], "0/3 | Maximum");
        assert_eq!(lines[5], "2/5 | **Total**");
        assert_eq!(lines.last().copied(), Some(RESULTS_SENTINEL));
    }

    #[test]
    fn test_insert_before_first_heading() {
        let readme = "Intro text\n# Exercice 1\nDo things\n";
        let out = splice_readme(readme, &grades());
        assert!(out.starts_with("Intro text\n## Résultats\n"));
        let sentinel_at = out.find(RESULTS_SENTINEL).unwrap();
        let heading_at = out.find("# Exercice 1").unwrap();
        assert!(sentinel_at < heading_at);
        assert!(out.ends_with("Do things\n"));
    }

    #[test]
    fn test_insert_at_top_without_heading() {
        let out = splice_readme("plain text\n", &grades());
        assert!(out.starts_with("## Résultats\n"));
        assert!(out.ends_with("\n\nplain text\n"));
    }

    #[test]
    fn test_replace_existing_section() {
        let first = splice_readme("# Exercice\nbody\n", &grades());

        let mut improved = grades();
        improved[1].passing = true;
        let second = splice_readme(&first, &improved);

        assert!(second.contains("3/3 | Maximum"));
        assert!(second.contains("5/5 | **Total**"));
        assert!(!second.contains("0/3 | Maximum"));
        assert_eq!(second.matches(RESULTS_HEADING).count(), 1);
        assert!(second.ends_with("# Exercice\nbody\n"));
    }

    #[test]
    fn test_splice_is_idempotent() {
        let once = splice_readme("# Title\n\nSome text\n", &grades());
        let twice = splice_readme(&once, &grades());
        assert_eq!(once, twice);
    }
}
