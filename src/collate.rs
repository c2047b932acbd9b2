use std::cmp::Ordering;

use serde_json::Value;

/// A view key that can be compared the way CouchDB orders view rows.
///
/// Stall detection and cursor ordering go through `collate` rather than
/// `PartialEq`, so `1` and `1.0` in a JSON key compare as the same position.
pub trait ViewKey {
    fn collate(&self, other: &Self) -> Ordering;

    fn collates_equal(&self, other: &Self) -> bool {
        self.collate(other) == Ordering::Equal
    }
}

// ── Scalars ──────────────────────────────────────────────────

impl ViewKey for String {
    fn collate(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl ViewKey for bool {
    fn collate(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

macro_rules! int_view_key {
    ($($t:ty),*) => {
        $(impl ViewKey for $t {
            fn collate(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        })*
    };
}

int_view_key!(i32, i64, u32, u64, usize);

impl ViewKey for f64 {
    fn collate(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl ViewKey for chrono::NaiveDate {
    fn collate(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

// ── Composites ───────────────────────────────────────────────

/// `None` stands for a JSON `null` key, which sorts before everything.
impl<T: ViewKey> ViewKey for Option<T> {
    fn collate(&self, other: &Self) -> Ordering {
        match (self, other) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.collate(b),
        }
    }
}

/// Arrays compare element-wise; a prefix sorts before the longer array.
impl<T: ViewKey> ViewKey for Vec<T> {
    fn collate(&self, other: &Self) -> Ordering {
        for (a, b) in self.iter().zip(other.iter()) {
            match a.collate(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.len().cmp(&other.len())
    }
}

impl<A: ViewKey, B: ViewKey> ViewKey for (A, B) {
    fn collate(&self, other: &Self) -> Ordering {
        self.0
            .collate(&other.0)
            .then_with(|| self.1.collate(&other.1))
    }
}

impl<A: ViewKey, B: ViewKey, C: ViewKey> ViewKey for (A, B, C) {
    fn collate(&self, other: &Self) -> Ordering {
        self.0
            .collate(&other.0)
            .then_with(|| self.1.collate(&other.1))
            .then_with(|| self.2.collate(&other.2))
    }
}

// ── Arbitrary JSON ───────────────────────────────────────────

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// CouchDB collation: null < false < true < numbers < strings < arrays < objects.
///
/// Strings compare by code point, not by ICU collation, so mixed-case keys may
/// order differently than on the server. Objects compare member by member in
/// sorted key order, whereas CouchDB walks them in the order they were written,
/// so two objects may order differently than on the server too. Equality is
/// exact either way.
impl ViewKey for Value {
    fn collate(&self, other: &Self) -> Ordering {
        let rank = type_rank(self).cmp(&type_rank(other));
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.collate(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.cmp(kb).then_with(|| va.collate(vb)) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            // Same rank, no payload to compare (null, true, false)
            _ => Ordering::Equal,
        }
    }
}
