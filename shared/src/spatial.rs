//! Read-only spatial index over one world's environment.
//!
//! Objects are bucketed by position into a uniform grid so viewport queries
//! only touch the cells overlapping the query box. The grid is an
//! optimization only: [`SpatialIndex::visible_within`] returns exactly the
//! objects a linear scan with the same box predicate would.

use crate::environment::{EnvironmentObject, EnvironmentSet, Rect};
use rand::Rng;

pub const DEFAULT_CELL_SIZE: f32 = 1000.0;

/// Upper bound on grid cells; sparse huge worlds get coarser cells instead.
pub const MAX_GRID_CELLS: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    set: EnvironmentSet,
    cell_size: f32,
    columns: usize,
    rows: usize,
    /// Row-major cells holding indices into `set.objects`, ascending.
    cells: Vec<Vec<usize>>,
    /// Indices of every non-blocking object, used to pick spawn anchors.
    anchors: Vec<usize>,
}

/// Query box with its bounds already expanded by the margin.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
}

impl Bounds {
    fn around(center_x: f32, center_y: f32, width: f32, height: f32, margin: f32) -> Self {
        let half_w = width / 2.0 + margin;
        let half_h = height / 2.0 + margin;
        Self {
            min_x: center_x - half_w,
            max_x: center_x + half_w,
            min_y: center_y - half_h,
            max_y: center_y + half_h,
        }
    }

    fn contains(&self, (x, y): (f32, f32)) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl SpatialIndex {
    pub fn new(set: EnvironmentSet) -> Self {
        Self::with_cell_size(set, DEFAULT_CELL_SIZE)
    }

    pub fn with_cell_size(set: EnvironmentSet, cell_size: f32) -> Self {
        let mut cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };

        let (max_x, max_y) = set
            .objects
            .iter()
            .map(EnvironmentObject::position)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold((0.0f32, 0.0f32), |(mx, my), (x, y)| (mx.max(x), my.max(y)));

        let span = |extent: f32, size: f32| (extent / size).floor() as usize + 1;
        while span(max_x, cell_size).saturating_mul(span(max_y, cell_size)) > MAX_GRID_CELLS {
            cell_size *= 2.0;
        }
        let columns = span(max_x, cell_size);
        let rows = span(max_y, cell_size);

        let mut cells = vec![Vec::new(); columns * rows];
        let mut anchors = Vec::new();

        for (index, obj) in set.objects.iter().enumerate() {
            let (x, y) = obj.position();
            let column = Self::cell_coord(x, cell_size, columns);
            let row = Self::cell_coord(y, cell_size, rows);
            cells[row * columns + column].push(index);

            if !obj.is_blocking() {
                anchors.push(index);
            }
        }

        Self {
            set,
            cell_size,
            columns,
            rows,
            cells,
            anchors,
        }
    }

    fn cell_coord(value: f32, cell_size: f32, count: usize) -> usize {
        if value <= 0.0 || value.is_nan() {
            return 0;
        }
        ((value / cell_size).floor() as usize).min(count - 1)
    }

    pub fn objects(&self) -> &[EnvironmentObject] {
        &self.set.objects
    }

    pub fn regions(&self) -> &[Rect] {
        &self.set.regions
    }

    pub fn len(&self) -> usize {
        self.set.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.objects.is_empty()
    }

    /// True iff the point lies inside any blocking region, edges included.
    pub fn is_blocked(&self, x: f32, y: f32) -> bool {
        self.set.regions.iter().any(|rect| rect.contains(x, y))
    }

    /// Every object whose position lies within the box centred on
    /// `(center_x, center_y)` with the given size, grown by `margin` on each
    /// side. Bounds are inclusive.
    ///
    /// The iterator walks cells in row-major order and objects in generation
    /// order within a cell, so a fixed query always yields the same sequence.
    pub fn visible_within(
        &self,
        center_x: f32,
        center_y: f32,
        width: f32,
        height: f32,
        margin: f32,
    ) -> impl Iterator<Item = &EnvironmentObject> + '_ {
        let bounds = Bounds::around(center_x, center_y, width, height, margin);

        // Out-of-world coordinates clamp to the edge cells, which also hold
        // any object placed outside the grid.
        let columns = Self::cell_coord(bounds.min_x, self.cell_size, self.columns)
            ..Self::cell_coord(bounds.max_x, self.cell_size, self.columns) + 1;
        let rows = Self::cell_coord(bounds.min_y, self.cell_size, self.rows)
            ..Self::cell_coord(bounds.max_y, self.cell_size, self.rows) + 1;

        rows.flat_map(move |row| columns.clone().map(move |column| row * self.columns + column))
            .flat_map(move |cell| self.cells[cell].iter())
            .map(move |&index| &self.set.objects[index])
            .filter(move |obj| bounds.contains(obj.position()))
    }

    /// A uniformly random non-blocking object, or `None` if there is none.
    pub fn pick_spawn_anchor<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&EnvironmentObject> {
        if self.anchors.is_empty() {
            return None;
        }
        let index = self.anchors[rng.gen_range(0..self.anchors.len())];
        Some(&self.set.objects[index])
    }
}
