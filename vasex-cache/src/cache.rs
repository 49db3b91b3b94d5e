use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref LABEL_INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Interns a label and returns its stable id.
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    if let Some(idx) = LABEL_INTERNER
        .read()
        .expect("label interner poisoned")
        .iter()
        .position(|a| *a == atom)
    {
        return idx;
    }

    let mut v = LABEL_INTERNER.write().expect("label interner poisoned");
    // Another writer may have pushed the same label between the two locks.
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

/// Number of labels interned so far.
pub fn text_count() -> usize {
    LABEL_INTERNER.read().expect("label interner poisoned").len()
}

/// Label for an id returned by [`intern_text`].
pub fn get_text(id: usize) -> Option<Atom> {
    LABEL_INTERNER
        .read()
        .expect("label interner poisoned")
        .get(id)
        .cloned()
}
