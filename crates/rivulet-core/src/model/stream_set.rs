use derive_more::Display;
use std::fmt;

///
/// StreamId
/// Position of a relation instance within one statement.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StreamId(u8);

impl StreamId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    const fn word_and_bit(self) -> (usize, u64) {
        ((self.0 / 64) as usize, 1 << (self.0 % 64))
    }
}

///
/// StreamSet
///
/// Fixed-width bitset over stream ids. Copy semantics make it usable as an
/// immutable snapshot passed down the join search.
///

#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StreamSet([u64; 4]);

impl StreamSet {
    pub const EMPTY: Self = Self([0; 4]);

    /// Number of distinct stream ids a set can hold.
    pub const CAPACITY: usize = 256;

    #[must_use]
    pub const fn single(stream: StreamId) -> Self {
        Self::EMPTY.with(stream)
    }

    #[must_use]
    pub const fn with(self, stream: StreamId) -> Self {
        let (word, bit) = stream.word_and_bit();
        let mut words = self.0;
        words[word] |= bit;
        Self(words)
    }

    #[must_use]
    pub const fn without(self, stream: StreamId) -> Self {
        let (word, bit) = stream.word_and_bit();
        let mut words = self.0;
        words[word] &= !bit;
        Self(words)
    }

    pub const fn insert(&mut self, stream: StreamId) {
        *self = self.with(stream);
    }

    #[must_use]
    pub const fn contains(self, stream: StreamId) -> bool {
        let (word, bit) = stream.word_and_bit();
        self.0[word] & bit != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self([
            self.0[0] | other.0[0],
            self.0[1] | other.0[1],
            self.0[2] | other.0[2],
            self.0[3] | other.0[3],
        ])
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self([
            self.0[0] & other.0[0],
            self.0[1] & other.0[1],
            self.0[2] & other.0[2],
            self.0[3] & other.0[3],
        ])
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self([
            self.0[0] & !other.0[0],
            self.0[1] & !other.0[1],
            self.0[2] & !other.0[2],
            self.0[3] & !other.0[3],
        ])
    }

    #[must_use]
    pub const fn is_subset(self, other: Self) -> bool {
        self.difference(other).is_empty()
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        (self.0[0].count_ones()
            + self.0[1].count_ones()
            + self.0[2].count_ones()
            + self.0[3].count_ones()) as usize
    }

    /// Members in ascending id order.
    pub fn iter(self) -> impl Iterator<Item = StreamId> {
        (0..=u8::MAX)
            .map(StreamId::new)
            .filter(move |stream| self.contains(*stream))
    }
}

impl FromIterator<StreamId> for StreamSet {
    fn from_iter<I: IntoIterator<Item = StreamId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Debug for StreamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(StreamId::get)).finish()
    }
}
