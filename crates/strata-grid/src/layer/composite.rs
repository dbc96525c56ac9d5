//! Arranging independent layer stacks into one grid.
//!
//! A composite lays out child regions in a rectangular arrangement (the
//! classic one is corner / column header over row header / body) and
//! presents them as a single position space. Each region is the top of its
//! own layer stack; the composite only offsets coordinates by the region's
//! origin, it never reaches into a child's transforms.
//!
//! Band extents come from the first row (for column bands) and the first
//! column (for row bands); the other regions in a band are expected to
//! agree. Cells falling outside a smaller child simply read as
//! [`CellValue::None`].

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::logging::targets;

use crate::command::GridCommand;
use crate::coordinate::{Axis, CellPosition, CellRegion, PositionRange};
use crate::data::{CellValue, Sizing};
use crate::event::{LayerSignals, SelectionEvent, StructuralEvent, StructuralKind};
use crate::layer::Layer;
use crate::{GridError, GridResult};

/// Identifies one region of a composite arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionName(pub &'static str);

impl RegionName {
    /// The scrolling data body.
    pub const BODY: Self = Self("body");
    /// The column header strip.
    pub const COLUMN_HEADER: Self = Self("column_header");
    /// The row header strip.
    pub const ROW_HEADER: Self = Self("row_header");
    /// The corner between the headers.
    pub const CORNER: Self = Self("corner");
}

impl std::fmt::Display for RegionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// One named child stack of a composite.
#[derive(Clone)]
pub struct Region {
    /// The region's name, used for targeted command routing.
    pub name: RegionName,
    /// The top layer of the region's stack.
    pub layer: Arc<dyn Layer>,
}

impl Region {
    /// Creates a named region over the top of a stack.
    pub fn new(name: RegionName, layer: Arc<dyn Layer>) -> Self {
        Self { name, layer }
    }
}

/// Cumulative band offsets; entry `b` is the composite position where band
/// `b` starts, with one extra entry for the total.
struct Offsets {
    columns: Vec<usize>,
    rows: Vec<usize>,
}

/// A layer presenting a rectangular arrangement of child stacks as one
/// position space.
pub struct CompositeLayer {
    /// Row-major arrangement of regions.
    arrangement: Vec<Vec<Region>>,
    offsets: RwLock<Option<Offsets>>,
    signals: LayerSignals,
}

impl CompositeLayer {
    /// Builds a composite from a row-major arrangement.
    ///
    /// Fails if the arrangement is empty, ragged, or reuses a region name.
    pub fn new(arrangement: Vec<Vec<Region>>) -> GridResult<Arc<Self>> {
        let expected = arrangement.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(GridError::EmptyArrangement);
        }
        for (row, regions) in arrangement.iter().enumerate() {
            if regions.len() != expected {
                return Err(GridError::RaggedArrangement {
                    row,
                    found: regions.len(),
                    expected,
                });
            }
        }
        let mut names = std::collections::HashSet::new();
        for region in arrangement.iter().flatten() {
            if !names.insert(region.name) {
                return Err(GridError::DuplicateRegion {
                    name: region.name.0,
                });
            }
        }

        let layer = Arc::new(Self {
            arrangement,
            offsets: RwLock::new(None),
            signals: LayerSignals::new(),
        });

        for (band_row, regions) in layer.arrangement.iter().enumerate() {
            for (band_column, region) in regions.iter().enumerate() {
                layer.wire_child(region, band_column, band_row);
            }
        }

        Ok(layer)
    }

    fn wire_child(self: &Arc<Self>, region: &Region, band_column: usize, band_row: usize) {
        let signals = region.layer.signals();

        let weak: Weak<Self> = Arc::downgrade(self);
        signals.structural_changed.connect(move |event| {
            if let Some(layer) = weak.upgrade() {
                layer.on_child_structural(band_column, band_row, event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        signals.visual_changed.connect(move |child_region| {
            if let Some(layer) = weak.upgrade() {
                let (dc, dr) = layer.band_origin(band_column, band_row);
                layer.signals.emit_visual(CellRegion::new(
                    CellPosition::new(child_region.origin.column + dc, child_region.origin.row + dr),
                    child_region.columns,
                    child_region.rows,
                ));
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        signals.selection_changed.connect(move |event| {
            if let Some(layer) = weak.upgrade() {
                let (dc, dr) = layer.band_origin(band_column, band_row);
                let shift = |cells: &[CellPosition]| {
                    cells
                        .iter()
                        .map(|cell| CellPosition::new(cell.column + dc, cell.row + dr))
                        .collect()
                };
                layer.signals.emit_selection(SelectionEvent {
                    selected: shift(&event.selected),
                    deselected: shift(&event.deselected),
                });
            }
        });
    }

    fn on_child_structural(&self, band_column: usize, band_row: usize, event: &StructuralEvent) {
        // Any child change can move every band boundary after it.
        *self.offsets.write() = None;
        if event.kind == StructuralKind::Reset {
            self.signals.emit_structural(
                event.axis,
                StructuralKind::Reset,
                PositionRange::new(0, self.count(event.axis)),
            );
            return;
        }
        let (dc, dr) = self.band_origin(band_column, band_row);
        let delta = match event.axis {
            Axis::Horizontal => dc,
            Axis::Vertical => dr,
        };
        self.signals.emit_structural(
            event.axis,
            event.kind,
            PositionRange::new(event.range.start + delta, event.range.end + delta),
        );
    }

    fn with_offsets<R>(&self, f: impl FnOnce(&Offsets) -> R) -> R {
        {
            let cached = self.offsets.read();
            if let Some(offsets) = cached.as_ref() {
                return f(offsets);
            }
        }

        // Column bands are sized by the first arrangement row, row bands by
        // the first column.
        let mut columns = vec![0];
        for region in &self.arrangement[0] {
            columns.push(columns.last().copied().unwrap_or(0) + region.layer.column_count());
        }
        let mut rows = vec![0];
        for regions in &self.arrangement {
            rows.push(rows.last().copied().unwrap_or(0) + regions[0].layer.row_count());
        }

        let offsets = Offsets { columns, rows };
        let result = f(&offsets);
        *self.offsets.write() = Some(offsets);
        result
    }

    /// Composite position where the band at the given arrangement slot
    /// starts.
    fn band_origin(&self, band_column: usize, band_row: usize) -> (usize, usize) {
        self.with_offsets(|offsets| (offsets.columns[band_column], offsets.rows[band_row]))
    }

    /// The child layer registered under a name.
    pub fn region(&self, name: RegionName) -> Option<&Arc<dyn Layer>> {
        self.arrangement
            .iter()
            .flatten()
            .find(|region| region.name == name)
            .map(|region| &region.layer)
    }

    /// Locates the region containing a composite cell, returning the region
    /// and the cell in its local space.
    pub fn locate(&self, cell: CellPosition) -> Option<(&Region, CellPosition)> {
        self.with_offsets(|offsets| {
            let band_column = offsets.columns.partition_point(|&o| o <= cell.column);
            let band_row = offsets.rows.partition_point(|&o| o <= cell.row);
            if band_column == 0
                || band_row == 0
                || cell.column >= *offsets.columns.last()?
                || cell.row >= *offsets.rows.last()?
            {
                return None;
            }
            let local = CellPosition::new(
                cell.column - offsets.columns[band_column - 1],
                cell.row - offsets.rows[band_row - 1],
            );
            Some((&self.arrangement[band_row - 1][band_column - 1], local))
        })
    }

    /// Locates the band containing an axis position, returning the band's
    /// arrangement slot and the local position.
    fn locate_band(&self, axis: Axis, position: usize) -> Option<(usize, usize)> {
        self.with_offsets(|offsets| {
            let bands = match axis {
                Axis::Horizontal => &offsets.columns,
                Axis::Vertical => &offsets.rows,
            };
            if position >= *bands.last()? {
                return None;
            }
            let band = bands.partition_point(|&o| o <= position) - 1;
            Some((band, position - bands[band]))
        })
    }

    /// Arrangement slot of the body region, defaulting to (0, 0).
    fn body_slot(&self) -> (usize, usize) {
        self.arrangement
            .iter()
            .enumerate()
            .find_map(|(r, regions)| {
                regions
                    .iter()
                    .position(|region| region.name == RegionName::BODY)
                    .map(|c| (c, r))
            })
            .unwrap_or((0, 0))
    }

    /// The region consulted for axis queries in the given band: the one in
    /// the body's arrangement row (or column), whose transforms define the
    /// axis.
    fn band_region(&self, axis: Axis, band: usize) -> &Region {
        let (body_column, body_row) = self.body_slot();
        match axis {
            Axis::Horizontal => &self.arrangement[body_row][band],
            Axis::Vertical => &self.arrangement[band][body_column],
        }
    }
}

impl Layer for CompositeLayer {
    fn column_count(&self) -> usize {
        self.with_offsets(|offsets| offsets.columns.last().copied().unwrap_or(0))
    }

    fn row_count(&self) -> usize {
        self.with_offsets(|offsets| offsets.rows.last().copied().unwrap_or(0))
    }

    /// The composite has no single underlying layer; translation stops
    /// here.
    fn underlying_position(&self, _axis: Axis, _position: usize) -> Option<usize> {
        None
    }

    fn position_of_underlying(&self, _axis: Axis, _underlying: usize) -> Option<usize> {
        None
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn signals(&self) -> &LayerSignals {
        &self.signals
    }

    fn position_to_index(&self, axis: Axis, position: usize) -> Option<usize> {
        let (band, local) = self.locate_band(axis, position)?;
        self.band_region(axis, band).layer.position_to_index(axis, local)
    }

    fn index_to_position(&self, axis: Axis, index: usize) -> Option<usize> {
        // Resolve against the body band, the one whose indexes identify
        // data.
        let (band_column, band_row) = self.body_slot();
        let region = &self.arrangement[band_row][band_column];
        if region.name != RegionName::BODY {
            return None;
        }
        let local = region.layer.index_to_position(axis, index)?;
        let (dc, dr) = self.band_origin(band_column, band_row);
        Some(match axis {
            Axis::Horizontal => local + dc,
            Axis::Vertical => local + dr,
        })
    }

    fn position_size(&self, axis: Axis, position: usize) -> f32 {
        match self.locate_band(axis, position) {
            Some((band, local)) => self.band_region(axis, band).layer.position_size(axis, local),
            None => 0.0,
        }
    }

    fn position_sizing(&self, axis: Axis, position: usize) -> Sizing {
        match self.locate_band(axis, position) {
            Some((band, local)) => self
                .band_region(axis, band)
                .layer
                .position_sizing(axis, local),
            None => Sizing::Default,
        }
    }

    fn cell_value(&self, column: usize, row: usize) -> CellValue {
        match self.locate(CellPosition::new(column, row)) {
            Some((region, local)) => region.layer.cell_value(local.column, local.row),
            None => CellValue::None,
        }
    }

    /// Routes commands to the children: a [`GridCommand::Targeted`] goes to
    /// the named region only; everything else is offered to the body first,
    /// then the remaining regions in arrangement order.
    fn do_command(&self, command: &GridCommand) -> bool {
        if let GridCommand::Targeted { region, inner } = command {
            return match self.region(*region) {
                Some(layer) => layer.do_command(inner),
                None => {
                    tracing::debug!(
                        target: targets::COMPOSITE,
                        region = %region,
                        "targeted command dropped: no such region"
                    );
                    false
                }
            };
        }

        if let Some(body) = self.region(RegionName::BODY) {
            if body.do_command(command) {
                return true;
            }
        }
        self.arrangement
            .iter()
            .flatten()
            .filter(|region| region.name != RegionName::BODY)
            .any(|region| region.layer.do_command(command))
    }
}
