use std::fmt;

use rpds::ListSync;

use crate::ast::Value;

/// Persistent singly linked list. `cons` shares the tail, so older handles
/// never observe a change.
#[derive(Clone)]
pub struct Seq {
    list: ListSync<Value>,
}

impl Seq {
    pub fn empty() -> Self {
        Self {
            list: ListSync::new_sync(),
        }
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        let mut list = ListSync::new_sync();
        for item in items.into_iter().rev() {
            list.push_front_mut(item);
        }
        Self { list }
    }

    pub fn count(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn first(&self) -> Option<&Value> {
        self.list.first()
    }

    /// The list without its head. Empty (never an error) at the end.
    pub fn next(&self) -> Seq {
        match self.list.drop_first() {
            Some(list) => Self { list },
            None => Seq::empty(),
        }
    }

    /// New list with `value` at the front; `self` is unchanged.
    pub fn cons(&self, value: Value) -> Seq {
        Self {
            list: self.list.push_front(value),
        }
    }

    /// Prepend every item in order, so `conj(a, b)` yields `(b a ...)`.
    pub fn conj(&self, items: impl IntoIterator<Item = Value>) -> Seq {
        let mut list = self.list.clone();
        for item in items {
            list.push_front_mut(item);
        }
        Self { list }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        self.list.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.list.iter().cloned().collect()
    }
}

impl Default for Seq {
    fn default() -> Self {
        Seq::empty()
    }
}

impl PartialEq for Seq {
    fn eq(&self, other: &Self) -> bool {
        self.count() == other.count() && self.iter().zip(other.iter()).all(|(a, b)| a.equals(b))
    }
}

impl FromIterator<Value> for Seq {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Seq::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(seq: &Seq) -> Vec<i64> {
        seq.iter()
            .map(|v| match v {
                Value::Int(n) => *n,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn cons_keeps_original() {
        let base = Seq::from_vec(vec![Value::Int(2), Value::Int(3)]);
        let extended = base.cons(Value::Int(1));
        assert_eq!(ints(&base), vec![2, 3]);
        assert_eq!(ints(&extended), vec![1, 2, 3]);
        assert_eq!(extended.count(), 3);
    }

    #[test]
    fn next_walks_to_empty() {
        let seq = Seq::from_vec(vec![Value::Int(1)]);
        let rest = seq.next();
        assert!(rest.is_empty());
        assert!(rest.first().is_none());
        assert!(rest.next().is_empty());
    }

    #[test]
    fn conj_prepends_in_order() {
        let seq = Seq::empty().conj(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(ints(&seq), vec![2, 1]);
    }
}
