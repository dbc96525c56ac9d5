//! End-to-end tests of assembled layer stacks.

use std::sync::Arc;

use strata_grid::prelude::*;

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Five columns, widths 150 / 100 / 35 / 100 / 80, one row of letters.
fn sized_grid() -> Arc<DataLayer> {
    let mut grid = VecGrid::new(5);
    grid.push_row(vec![
        "a".into(),
        "b".into(),
        "c".into(),
        "d".into(),
        "e".into(),
    ]);
    grid.set_column_sizing(vec![
        Sizing::Pixels(150.0),
        Sizing::Pixels(100.0),
        Sizing::Pixels(35.0),
        Sizing::Pixels(100.0),
        Sizing::Pixels(80.0),
    ]);
    DataLayer::new(Arc::new(grid))
}

fn uniform_grid(columns: usize, rows: usize) -> Arc<DataLayer> {
    let mut grid = VecGrid::new(columns);
    for r in 0..rows {
        grid.push_row((0..columns).map(|c| format!("{c}:{r}").into()).collect());
    }
    DataLayer::new(Arc::new(grid))
}

#[test]
fn swapping_columns_swaps_widths_with_them() {
    init_logging();
    let reorder = ReorderLayer::new(sized_grid());

    // Swap columns 0 and 2.
    assert!(reorder.reorder(Axis::Horizontal, 0, 2));
    assert!(reorder.reorder(Axis::Horizontal, 1, 0));
    assert_eq!(reorder.order(Axis::Horizontal), vec![2, 1, 0, 3, 4]);

    let widths: Vec<f32> = (0..5)
        .map(|p| reorder.position_size(Axis::Horizontal, p))
        .collect();
    assert_eq!(widths, vec![35.0, 100.0, 150.0, 100.0, 80.0]);

    // Index resolution reports the permutation.
    let indexes: Vec<_> = (0..5)
        .map(|p| reorder.position_to_index(Axis::Horizontal, p).unwrap())
        .collect();
    assert_eq!(indexes, vec![2, 1, 0, 3, 4]);
}

#[test]
fn hiding_closes_the_gap() {
    init_logging();
    let hide = HideShowLayer::new(sized_grid());

    hide.hide(Axis::Horizontal, &[1]);
    assert_eq!(hide.column_count(), 4);
    assert_eq!(hide.underlying_position(Axis::Horizontal, 1), Some(2));
    assert_eq!(hide.position_to_index(Axis::Horizontal, 1), Some(2));
    assert_eq!(hide.index_to_position(Axis::Horizontal, 1), None);

    // Show is the inverse.
    hide.show(Axis::Horizontal, &[1]);
    assert_eq!(hide.column_count(), 5);
    for p in 0..5 {
        assert_eq!(hide.position_to_index(Axis::Horizontal, p), Some(p));
    }
}

#[test]
fn viewport_windows_and_scrolls() {
    init_logging();
    let area = FixedClientArea::new(Size::new(200.0, 48.0));
    let viewport = ViewportLayer::new(uniform_grid(5, 4), area);

    // 100px columns in a 200px client: two fully visible.
    assert_eq!(viewport.column_count(), 2);
    assert_eq!(viewport.origin(Axis::Horizontal), 0);
    assert_eq!(viewport.origin_offset(Axis::Horizontal), 0.0);

    // Scrolling 50px keeps column 0 as the clipped origin and pulls a
    // third column partially into view.
    assert!(viewport.do_command(&GridCommand::Scroll {
        axis: Axis::Horizontal,
        delta: 50.0,
    }));
    assert_eq!(viewport.origin(Axis::Horizontal), 0);
    assert_eq!(viewport.origin_offset(Axis::Horizontal), -50.0);
    assert_eq!(viewport.column_count(), 3);
    assert_eq!(viewport.visible_range(Axis::Horizontal), PositionRange::new(0, 3));
}

#[test]
fn full_body_stack_translates_commands_downward() {
    init_logging();
    let data = uniform_grid(6, 4);
    let reorder = ReorderLayer::new(data.clone());
    let hide = HideShowLayer::new(reorder.clone());
    let selection = SelectionLayer::new(hide.clone());
    let area = FixedClientArea::new(Size::new(300.0, 96.0));
    let viewport = ViewportLayer::new(selection.clone(), area);

    hide.hide(Axis::Horizontal, &[0]);
    viewport.do_command(&GridCommand::Scroll {
        axis: Axis::Horizontal,
        delta: 100.0,
    });
    assert_eq!(viewport.origin(Axis::Horizontal), 1);

    // Selecting viewport cell (0, 0) must land on the cell the user sees:
    // selection position (1, 0), which is data column 2 (column 0 hidden).
    assert!(viewport.do_command(&GridCommand::SelectCell {
        cell: CellPosition::new(0, 0),
        flags: SelectionFlags::REPLACE,
    }));
    assert_eq!(selection.selected_cells(), vec![CellPosition::new(1, 0)]);
    assert_eq!(viewport.position_to_index(Axis::Horizontal, 0), Some(2));

    // A resize issued at the top lands in the data layer's size table.
    assert!(viewport.do_command(&GridCommand::Resize {
        axis: Axis::Horizontal,
        position: 0,
        size: 60.0,
    }));
    assert_eq!(data.size(Axis::Horizontal, 2), 60.0);
}

#[test]
fn selection_survives_reorder_and_hide() {
    init_logging();
    let reorder = ReorderLayer::new(uniform_grid(5, 3));
    let hide = HideShowLayer::new(reorder.clone());
    let selection = SelectionLayer::new(hide.clone());

    // Select the cell holding "3:1".
    selection.select_cell(CellPosition::new(3, 1), SelectionFlags::REPLACE);

    assert!(reorder.reorder(Axis::Horizontal, 3, 0));
    assert_eq!(selection.selected_cells(), vec![CellPosition::new(0, 1)]);
    assert_eq!(selection.cell_value(0, 1).as_text(), Some("3:1"));

    hide.hide(Axis::Horizontal, &[0]);
    assert!(selection.selected_cells().is_empty());

    hide.show_all(Axis::Horizontal);
    assert_eq!(selection.selected_cells(), vec![CellPosition::new(0, 1)]);
}

#[test]
fn events_translate_upward_per_hop() {
    init_logging();
    use parking_lot::Mutex;

    let data = uniform_grid(5, 3);
    let reorder = ReorderLayer::new(data.clone());
    let hide = HideShowLayer::new(reorder.clone());
    assert!(reorder.reorder(Axis::Horizontal, 0, 4));
    hide.hide(Axis::Horizontal, &[0]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    hide.signals().structural_changed.connect(move |event| {
        sink.lock().push(*event);
    });

    // Data column 2 sits at reorder position 1, hide position 0.
    data.set_size(Axis::Horizontal, 2, 70.0);

    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, StructuralKind::Resized);
    assert_eq!(events[0].range, PositionRange::single(0));
}

#[test]
fn cell_changes_surface_through_the_stack() {
    init_logging();
    use parking_lot::Mutex;

    let data = uniform_grid(5, 3);
    let reorder = ReorderLayer::new(data.clone());
    let hide = HideShowLayer::new(reorder.clone());
    assert!(reorder.reorder(Axis::Horizontal, 0, 4));
    hide.hide(Axis::Horizontal, &[0]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    hide.signals().visual_changed.connect(move |region| {
        sink.lock().push(*region);
    });

    // Data column 3 sits at reorder position 2, hide position 1.
    data.notify_cell_changed(CellRegion::single(CellPosition::new(3, 1)));
    // The hidden column's change never surfaces.
    data.notify_cell_changed(CellRegion::single(CellPosition::new(1, 0)));

    let regions = seen.lock();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0], CellRegion::single(CellPosition::new(1, 1)));
}

#[test]
fn frozen_panes_ignore_scrolling() {
    init_logging();
    let freeze = FreezeLayer::new(uniform_grid(6, 4));
    let frozen_strip = freeze.pane(true, false);
    let body = freeze.pane(false, false);
    freeze.freeze_at(2, 0).unwrap();

    let area = FixedClientArea::new(Size::new(200.0, 96.0));
    let viewport = ViewportLayer::new(body.clone(), area);

    viewport.scroll(Axis::Horizontal, 150.0);

    // The frozen strip still shows columns 0 and 1; the viewport windows
    // only the scrollable remainder.
    assert_eq!(frozen_strip.column_count(), 2);
    assert_eq!(frozen_strip.cell_value(0, 0).as_text(), Some("0:0"));
    assert_eq!(viewport.position_to_index(Axis::Horizontal, 0), Some(3));
}

#[test]
fn panes_share_one_selection_layer() {
    init_logging();
    let selection = SelectionLayer::new(uniform_grid(6, 4));
    let freeze = FreezeLayer::new(selection.clone());
    let frozen_strip = freeze.pane(true, false);
    let body = freeze.pane(false, false);

    let anchor_from = Arc::downgrade(&selection);
    freeze.set_anchor_source(Box::new(move || {
        anchor_from.upgrade().and_then(|s| s.anchor())
    }));

    selection.select_cell(CellPosition::new(2, 0), SelectionFlags::REPLACE);
    assert!(freeze.do_command(&GridCommand::Freeze));
    assert_eq!(freeze.frozen_count(Axis::Horizontal), 2);
    // Freezing must not disturb the selection it was anchored to.
    assert!(selection.is_selected(CellPosition::new(2, 0)));

    // A selection made through the body pane lands in the shared layer:
    // body position (0, 1) is freeze position (2, 1).
    assert!(body.do_command(&GridCommand::SelectCell {
        cell: CellPosition::new(0, 1),
        flags: SelectionFlags::SELECT,
    }));
    assert!(selection.is_selected(CellPosition::new(2, 1)));

    // And one made through the frozen strip reaches the same layer.
    assert!(frozen_strip.do_command(&GridCommand::SelectCell {
        cell: CellPosition::new(1, 3),
        flags: SelectionFlags::SELECT,
    }));
    assert!(selection.is_selected(CellPosition::new(1, 3)));
    assert_eq!(selection.selected_cells().len(), 3);
}

#[test]
fn percentage_columns_share_a_frozen_viewport() {
    init_logging();
    let mut grid = VecGrid::new(4);
    grid.push_row(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
    grid.set_column_sizing(vec![
        Sizing::Pixels(40.0),
        Sizing::Pixels(40.0),
        Sizing::Percentage(50.0),
        Sizing::Percentage(50.0),
    ]);
    let freeze = FreezeLayer::new(DataLayer::new(Arc::new(grid)));
    let body = freeze.pane(false, false);
    freeze.freeze_at(2, 0).unwrap();

    let area = FixedClientArea::new(Size::new(300.0, 48.0));
    let viewport = ViewportLayer::new(body, area);

    // The body pane holds only the two percentage columns, so each gets
    // half of the full client area.
    assert_eq!(viewport.column_count(), 2);
    assert_eq!(viewport.position_size(Axis::Horizontal, 0), 150.0);
    assert_eq!(viewport.position_size(Axis::Horizontal, 1), 150.0);
}

#[test]
fn arrangement_persists_and_restores() {
    init_logging();
    let build = || {
        let reorder = ReorderLayer::new(sized_grid());
        let hide = HideShowLayer::new(reorder.clone());
        (reorder, hide)
    };

    let (reorder, hide) = build();
    assert!(reorder.reorder(Axis::Horizontal, 0, 2));
    hide.hide(Axis::Horizontal, &[4]);
    reorder
        .underlying()
        .expect("data layer")
        .do_command(&GridCommand::Resize {
            axis: Axis::Horizontal,
            position: 1,
            size: 64.0,
        });

    let mut props = Properties::new();
    reorder.save_state("grid", &mut props);
    hide.save_state("grid", &mut props);
    let json = props.to_json().unwrap();

    let (reorder2, hide2) = build();
    let restored = Properties::from_json(&json).unwrap();
    reorder2.restore_state("grid", &restored).unwrap();
    hide2.restore_state("grid", &restored).unwrap();

    assert_eq!(reorder2.order(Axis::Horizontal), vec![1, 2, 0, 3, 4]);
    assert_eq!(hide2.hidden_indexes(Axis::Horizontal), vec![4]);
    assert_eq!(hide2.column_count(), 4);
    // The size override was not saved under these layers' prefixes and
    // stays at its fresh default.
    assert_eq!(hide2.position_size(Axis::Horizontal, 0), 100.0);
}

#[test]
fn composite_grid_routes_and_reports() {
    init_logging();
    use parking_lot::Mutex;

    let body_data = uniform_grid(3, 2);
    let body = SelectionLayer::new(body_data);
    let header = uniform_grid(3, 1);
    let row_header = uniform_grid(1, 2);
    let corner = uniform_grid(1, 1);

    let composite = CompositeLayer::new(vec![
        vec![
            Region::new(RegionName::CORNER, corner),
            Region::new(RegionName::COLUMN_HEADER, header),
        ],
        vec![
            Region::new(RegionName::ROW_HEADER, row_header),
            Region::new(RegionName::BODY, body.clone()),
        ],
    ])
    .unwrap();

    assert_eq!(composite.column_count(), 4);
    assert_eq!(composite.row_count(), 3);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    composite.signals().selection_changed.connect(move |event| {
        sink.lock().push(event.clone());
    });

    // A targeted selection reaches only the body; the composite reports it
    // shifted past the header bands.
    assert!(composite.do_command(&GridCommand::Targeted {
        region: RegionName::BODY,
        inner: Box::new(GridCommand::SelectCell {
            cell: CellPosition::new(1, 0),
            flags: SelectionFlags::REPLACE,
        }),
    }));
    assert_eq!(body.selected_cells(), vec![CellPosition::new(1, 0)]);

    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].selected, vec![CellPosition::new(2, 1)]);
}

#[test]
fn invalid_commands_fall_through_without_damage() {
    init_logging();
    let reorder = ReorderLayer::new(sized_grid());
    let hide = HideShowLayer::new(reorder.clone());
    hide.hide(Axis::Horizontal, &[1]);

    // A reorder aimed at a position past the hidden extent never finds a
    // handler; nothing changes.
    assert!(!hide.do_command(&GridCommand::Reorder {
        axis: Axis::Horizontal,
        from: 4,
        to: 0,
    }));
    assert_eq!(reorder.order(Axis::Horizontal), vec![0, 1, 2, 3, 4]);
    assert_eq!(hide.column_count(), 4);

    assert!(!hide.do_command(&GridCommand::Custom { name: "unknown" }));
}
