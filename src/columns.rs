use std::fmt;
use std::rc::Rc;

use crate::record::Record;

pub type CellFn<R> = Rc<dyn Fn(&R, &str, usize) -> String>;

/// How a column turns a row into cell text.
pub enum Render<R> {
    /// The raw field, styled per field.
    Plain,
    /// The raw field, styled as a number.
    Numeric,
    /// Caller supplied text for `(row, key, index)`.
    Computed(CellFn<R>),
}

impl<R> Clone for Render<R> {
    fn clone(&self) -> Self {
        match self {
            Render::Plain => Render::Plain,
            Render::Numeric => Render::Numeric,
            Render::Computed(f) => Render::Computed(Rc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for Render<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Render::Plain => write!(f, "Plain"),
            Render::Numeric => write!(f, "Numeric"),
            Render::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Column<R> {
    pub key: String,
    pub label: String,
    pub render: Render<R>,
}

impl<R: Record> Column<R> {
    pub fn plain(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            render: Render::Plain,
        }
    }

    pub fn numeric(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            render: Render::Numeric,
        }
    }

    pub fn computed(key: &str, label: &str, f: impl Fn(&R, &str, usize) -> String + 'static) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            render: Render::Computed(Rc::new(f)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.render, Render::Numeric)
    }

    /// Cell text for `row` at page position `index`.
    pub fn cell(&self, row: &R, index: usize) -> String {
        match &self.render {
            Render::Plain | Render::Numeric => row.field(&self.key).unwrap_or_default(),
            Render::Computed(f) => f(row, &self.key, index),
        }
    }
}

/// Ordered column definitions; the order is the on-screen order.
#[derive(Clone, Debug)]
pub struct Columns<R>(Vec<Column<R>>);

impl<R> Columns<R> {
    pub fn new(columns: Vec<Column<R>>) -> Self {
        Self(columns)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<R>> {
        self.0.iter()
    }
}

impl<R> Default for Columns<R> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<R> FromIterator<Column<R>> for Columns<R> {
    fn from_iter<I: IntoIterator<Item = Column<R>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
