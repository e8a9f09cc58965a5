//! Singular-or-sequence batch shape.
//!
//! Batch entry points accept either one value or an ordered list and hand
//! back the same shape they were given. Internally everything is processed
//! as a `Vec`; [`Shape`] remembers how to put the result back together.

/// Either a single value or an ordered sequence of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// The shape an input batch arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    One,
    Many,
}

impl<T> OneOrMany<T> {
    /// Splits the batch into its shape and a positional list of items.
    pub fn into_parts(self) -> (Shape, Vec<T>) {
        match self {
            Self::One(item) => (Shape::One, vec![item]),
            Self::Many(items) => (Shape::Many, items),
        }
    }

    /// Returns the shape of this batch.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::One(_) => Shape::One,
            Self::Many(_) => Shape::Many,
        }
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    /// True for an empty `Many`. A `One` is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the items in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }

    /// Returns the single item, or `None` for a `Many`.
    pub fn into_one(self) -> Option<T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(_) => None,
        }
    }

    /// Flattens the batch into a `Vec`, regardless of shape.
    pub fn into_vec(self) -> Vec<T> {
        self.into_parts().1
    }

    /// Applies `f` to every item, keeping the shape.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> OneOrMany<U> {
        let (shape, items) = self.into_parts();
        shape.rebuild(items.into_iter().map(f).collect())
    }
}

impl Shape {
    /// Reassembles positional results into this shape.
    ///
    /// A `One` shape given anything other than exactly one item degrades to
    /// `Many` rather than dropping values.
    pub fn rebuild<U>(self, items: Vec<U>) -> OneOrMany<U> {
        match self {
            Shape::Many => OneOrMany::Many(items),
            Shape::One => match <[U; 1]>::try_from(items) {
                Ok([item]) => OneOrMany::One(item),
                Err(items) => OneOrMany::Many(items),
            },
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(item: T) -> Self {
        Self::One(item)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
