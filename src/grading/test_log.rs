//! Line-oriented unit test log parsing

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub func_name: String,
    pub passing: bool,
}

/// Parse results from a verbose unittest log such as
/// `test_sum (tests.TestExercise) ... ok`.
///
/// The test function name is the text before the first space. Parsing stops
/// at the first line carrying none of the ` ok`, ` FAIL` or ` ERROR` markers,
/// even if later lines would match.
pub fn parse_test_log(text: &str) -> Vec<TestResult> {
    let mut results = Vec::new();
    for line in text.lines() {
        let passing = if line.contains(" ok") {
            true
        } else if line.contains(" FAIL") || line.contains(" ERROR") {
            false
        } else {
            break;
        };
        let func_name = line.split(' ').next().unwrap_or_default().to_string();
        results.push(TestResult { func_name, passing });
    }
    results
}
