use table_diff::{tables_equal, HighlightPatch, Table};

mod common;
use common::{apply_patch, csv_text, grid, hilite, round_trip, table_from_csv};

fn assert_round_trip(local: &Table, remote: &Table) {
    let result = round_trip(local, remote);
    assert!(
        tables_equal(&result, remote),
        "round trip mismatch\nlocal:\n{}remote:\n{}got:\n{}patch:\n{}",
        csv_text(local),
        csv_text(remote),
        csv_text(&result),
        csv_text(&hilite(local, remote)),
    );
}

#[test]
fn a_mixed_edit_patch_round_trips() {
    let a = grid(&[
        &["id", "name"],
        &["1", "ann"],
        &["2", "bob"],
        &["3", "cal"],
        &["4", "dee"],
        &["5", "eli"],
        &["6", "fay"],
        &["7", "gus"],
    ]);
    let b = grid(&[
        &["id", "name"],
        &["1", "ann"],
        &["3", "cal"],
        &["4", "dee"],
        &["9", "zed"],
        &["5", "eli"],
        &["6", "fay"],
        &["7", "gustav"],
    ]);
    assert_round_trip(&a, &b);
}

#[test]
fn row_reorders_round_trip() {
    let a = grid(&[&["id"], &["1"], &["2"], &["3"]]);
    let b = grid(&[&["id"], &["3"], &["1"], &["2"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn a_trailing_column_addition_round_trips() {
    let a = grid(&[&["a", "b"], &["1", "2"]]);
    let b = grid(&[&["a", "b", "c"], &["1", "2", "3"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn a_middle_column_removal_round_trips() {
    let a = grid(&[&["a", "b", "c"], &["1", "2", "3"]]);
    let b = grid(&[&["a", "c"], &["1", "3"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn a_column_rename_round_trips() {
    let a = grid(&[&["id", "name"], &["1", "ann"]]);
    let b = grid(&[&["id", "fullname"], &["1", "ann"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn updates_with_commas_survive_the_round_trip() {
    let a = grid(&[&["k", "v"], &["1", "a,b"], &["2", "keep"]]);
    let b = grid(&[&["k", "v"], &["1", "c,d"], &["2", "keep"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn blanking_a_cell_round_trips() {
    let a = grid(&[&["k", "v"], &["1", "x"], &["2", "y"]]);
    let b = grid(&[&["k", "v"], &["1", ""], &["2", "y"]]);
    assert_round_trip(&a, &b);
}

#[test]
fn a_patch_read_back_from_csv_still_applies() {
    // The same patch after a save/load cycle, quoting included.
    let a = grid(&[&["k", "v"], &["1", "a,b"], &["2", "keep"]]);
    let b = grid(&[&["k", "v"], &["1", "c,d"], &["2", "keep"]]);

    let patch = hilite(&a, &b);
    let reloaded = table_from_csv(&csv_text(&patch));

    let mut source = a.clone();
    apply_patch(&mut source, &reloaded);
    assert!(tables_equal(&source, &b));
}

#[test]
fn empty_and_narrow_patches_leave_the_source_alone() {
    let mut source = grid(&[&["a", "b"], &["1", "2"]]);
    let untouched = source.clone();

    let empty = Table::new(0, 0);
    let mut patcher = HighlightPatch::new(&mut source, &empty);
    patcher.apply().expect("empty patch is a no-op");
    assert!(tables_equal(&source, &untouched));

    let narrow = grid(&[&["@@"], &["->"]]);
    let mut patcher = HighlightPatch::new(&mut source, &narrow);
    patcher.apply().expect("narrow patch is a no-op");
    assert!(tables_equal(&source, &untouched));
}
