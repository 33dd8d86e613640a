//! Output selector tests: newest-by-mtime wins independent of creation or
//! listing order, and the naming pattern filters out everything else.

mod test_harness;

use gapwatch::config::ResultPattern;
use gapwatch::pipeline::select_newest;
use test_harness::TestWorkspace;

#[test]
fn pattern_matches_candidates_only() {
    let pattern = ResultPattern::default();

    assert!(pattern.matches("gap_analysis_1759856239.json"));
    assert!(pattern.matches("gap_analysis_b.json"));

    // The published artifact's fixed name is not a candidate
    assert!(!pattern.matches("gap_analysis.json"));
    // Empty suffix, wrong prefix, wrong extension
    assert!(!pattern.matches("gap_analysis_.json"));
    assert!(!pattern.matches("analysis_1.json"));
    assert!(!pattern.matches("gap_analysis_1.txt"));
    assert!(!pattern.matches("jobs.json"));
}

#[tokio::test]
async fn empty_directory_yields_no_candidate() {
    let ws = TestWorkspace::new();
    let pattern = ResultPattern::default();

    let selected = select_newest(&ws.working_dir, &pattern).await.unwrap();
    assert!(selected.is_none());
}

#[tokio::test]
async fn newest_mtime_wins() {
    let ws = TestWorkspace::new();
    let pattern = ResultPattern::default();

    ws.write_candidate("gap_analysis_1.json", "first");
    ws.write_candidate("gap_analysis_2.json", "second");
    let newest = ws.write_candidate("gap_analysis_3.json", "third");

    let selected = select_newest(&ws.working_dir, &pattern).await.unwrap().unwrap();
    assert_eq!(selected.path, newest);
}

#[tokio::test]
async fn mtime_beats_lexical_order() {
    let ws = TestWorkspace::new();
    let pattern = ResultPattern::default();

    // Lexically greatest name written first, so it is the oldest.
    ws.write_candidate("gap_analysis_zzz.json", "old");
    let newest = ws.write_candidate("gap_analysis_aaa.json", "new");

    let selected = select_newest(&ws.working_dir, &pattern).await.unwrap().unwrap();
    assert_eq!(selected.path, newest);
}

#[tokio::test]
async fn non_matching_files_are_ignored() {
    let ws = TestWorkspace::new();
    let pattern = ResultPattern::default();

    ws.write_candidate("notes.txt", "not a result");
    ws.write_candidate("gap_analysis.json", "artifact name, not a candidate");
    let only = ws.write_candidate("gap_analysis_1.json", "the result");
    ws.write_candidate("other_output.json", "wrong prefix");

    let selected = select_newest(&ws.working_dir, &pattern).await.unwrap().unwrap();
    assert_eq!(selected.path, only);
}

#[tokio::test]
async fn missing_directory_is_an_error() {
    let ws = TestWorkspace::new();
    let pattern = ResultPattern::default();

    let missing = ws.working_dir.join("nope");
    assert!(select_newest(&missing, &pattern).await.is_err());
}
