/// Holds at most one live resource pair and enforces release-then-create
/// ordering on replacement.
///
/// The field and its reference surface are created and destroyed together;
/// letting two pairs coexist would leave duplicate draw objects in the
/// scene. `replace_with` drops the current value before the builder runs,
/// so that overlap cannot be expressed.
#[derive(Debug, Default)]
pub struct FieldSlot<T> {
    current: Option<T>,
}

impl<T> FieldSlot<T> {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Replaces the live value: drops the old one first, then installs the
    /// builder's result. The first call simply has nothing to drop.
    ///
    /// If the builder fails the slot is left empty; callers decide whether
    /// that is recoverable.
    pub fn replace_with<E>(&mut self, build: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        self.current = None;
        let value = build()?;
        Ok(self.current.insert(value))
    }

    /// Infallible variant of [`FieldSlot::replace_with`] for builders that
    /// cannot fail.
    pub fn replace(&mut self, build: impl FnOnce() -> T) -> &T {
        self.current = None;
        self.current.insert(build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        id: u32,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.log.borrow_mut().push(format!("drop {}", self.id));
        }
    }

    fn build_probe(id: u32, log: &Rc<RefCell<Vec<String>>>) -> Probe {
        log.borrow_mut().push(format!("build {id}"));
        Probe {
            id,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn first_replacement_has_nothing_to_release() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = FieldSlot::new();
        assert!(slot.is_empty());
        slot.replace_with::<()>(|| Ok(build_probe(1, &log))).unwrap();
        assert_eq!(*log.borrow(), vec!["build 1"]);
        assert!(!slot.is_empty());
    }

    #[test]
    fn old_pair_is_released_before_the_new_one_is_built() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = FieldSlot::new();
        slot.replace_with::<()>(|| Ok(build_probe(1, &log))).unwrap();
        slot.replace_with::<()>(|| Ok(build_probe(2, &log))).unwrap();
        assert_eq!(*log.borrow(), vec!["build 1", "drop 1", "build 2"]);
    }

    #[test]
    fn exactly_one_value_lives_after_many_replacements() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = FieldSlot::new();
        for id in 0..5 {
            slot.replace_with::<()>(|| Ok(build_probe(id, &log))).unwrap();
        }
        assert_eq!(slot.get().map(|p| p.id), Some(4));
        let drops = log.borrow().iter().filter(|l| l.starts_with("drop")).count();
        assert_eq!(drops, 4);
    }

    #[test]
    fn infallible_replace_follows_the_same_ordering() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = FieldSlot::new();
        slot.replace(|| build_probe(1, &log));
        slot.replace(|| build_probe(2, &log));
        assert_eq!(*log.borrow(), vec!["build 1", "drop 1", "build 2"]);
    }

    #[test]
    fn failed_build_leaves_the_slot_empty() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot = FieldSlot::new();
        slot.replace_with::<()>(|| Ok(build_probe(1, &log))).unwrap();
        let result = slot.replace_with(|| Err::<Probe, &str>("decode failed"));
        assert!(result.is_err());
        assert!(slot.is_empty());
        // The old value is still released first; failure cannot resurrect it.
        assert_eq!(*log.borrow(), vec!["build 1", "drop 1"]);
    }
}
