use table_diff::{CompareFlags, DiffRender};

mod common;
use common::{grid, hilite, hilite3, hilite_with, table_from_csv};

fn html_of(diff: &table_diff::Table) -> String {
    let mut render = DiffRender::new();
    render.render(diff);
    render.html()
}

#[test]
fn a_cell_edit_renders_as_a_modify_row() {
    let local = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
    let remote = grid(&[&["id", "name"], &["1", "ann"], &["2", "robert"]]);

    let html = html_of(&hilite(&local, &remote));
    assert!(html.contains("<th>name</th>"));
    assert!(html.contains("<tr class=\"modify\">"));
    assert!(html.contains("bob\u{2192}robert"));
}

#[test]
fn three_way_conflicts_render_with_the_conflict_class() {
    let parent = grid(&[&["k", "v"], &["1", "10"]]);
    let local = grid(&[&["k", "v"], &["1", "11"]]);
    let remote = grid(&[&["k", "v"], &["1", "12"]]);

    let html = html_of(&hilite3(&parent, &local, &remote));
    assert!(html.contains("<tr class=\"conflict\">"));
    assert!(html.contains("10\u{2192}11\u{2192}12"));
}

#[test]
fn moved_rows_render_with_the_move_class() {
    let local = grid(&[&["id"], &["1"], &["2"], &["3"]]);
    let remote = grid(&[&["id"], &["3"], &["1"], &["2"]]);

    let html = html_of(&hilite(&local, &remote));
    assert!(html.contains("<tr class=\"move\">"));
}

#[test]
fn order_annotations_shift_actions_behind_the_corner() {
    let local = grid(&[&["id"], &["1"], &["2"], &["3"]]);
    let remote = grid(&[&["id"], &["2"], &["3"], &["1"]]);

    let diff = hilite_with(&local, &remote, CompareFlags::with_order_annotations());
    assert_eq!(diff.cell_text(0, 0), "@:@");

    let html = html_of(&diff);
    assert!(html.contains("<td>@:@</td>"));
    assert!(html.contains("<th>id</th>"));
    assert!(html.contains("<tr class=\"move\">"));
}

#[test]
fn added_rows_carry_the_class_on_the_row_not_the_cells() {
    let local = grid(&[&["k", "v"], &["1", "x"]]);
    let remote = table_from_csv("k,v\r\n1,x\r\n2,NULL\r\n");

    let html = html_of(&hilite(&local, &remote));
    assert!(html.contains("<tr class=\"add\"><td>+++</td><td>2</td><td></td></tr>"));
}

#[test]
fn an_added_column_classes_header_and_payload_cells() {
    let local = grid(&[&["a", "b"], &["1", "2"]]);
    let remote = grid(&[&["a", "b", "c"], &["1", "2", "3"]]);

    let html = html_of(&hilite(&local, &remote));
    assert!(html.contains("<tr class=\"spec\">"));
    assert!(html.contains("<th class=\"add\">c</th>"));
    assert!(html.contains("<td class=\"add\">3</td>"));
}
