// -------------------------------------------------------------------
// Versioned
// -------------------------------------------------------------------

/// A value whose version bumps on every write access.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    version: u64,
    data: T,
}

impl<T> Versioned<T> {
    pub fn new(data: T) -> Self {
        Self { version: 0, data }
    }
    pub fn get(&self) -> &T {
        &self.data
    }
    pub fn get_mut(&mut self) -> &mut T {
        self.version = self.version.wrapping_add(1);
        &mut self.data
    }
    pub fn set(&mut self, data: T) {
        self.data = data;
        self.version = self.version.wrapping_add(1);
    }
    pub fn version(&self) -> u64 {
        self.version
    }
}

// -------------------------------------------------------------------
// Memoized
// -------------------------------------------------------------------

/// Derived value recomputed only when its key changes.
///
/// The cached value may be edited in place through [`Memoized::get_mut`];
/// edits survive until the key changes, at which point they are discarded.
pub struct Memoized<S, K, V> {
    cached: Option<(K, V)>,
    get_key: Box<dyn Fn(&S) -> K>,
    calc: Box<dyn Fn(&S) -> V>,
}

impl<S, K, V> Memoized<S, K, V>
where
    K: PartialEq,
{
    pub fn new(
        get_key: impl Fn(&S) -> K + 'static,
        calc: impl Fn(&S) -> V + 'static,
    ) -> Self {
        Self {
            cached: None,
            get_key: Box::new(get_key),
            calc: Box::new(calc),
        }
    }

    /// Recompute only if the key changed; return the cached value.
    pub fn get<'a>(&'a mut self, store: &S) -> &'a V {
        self.get_mut(store)
    }

    /// Mutable access to the cached value, recomputing first if stale.
    pub fn get_mut<'a>(&'a mut self, store: &S) -> &'a mut V {
        let key = (self.get_key)(store);
        let fresh =
            matches!(&self.cached, Some((last, _)) if *last == key);
        if !fresh {
            self.cached = None;
        }
        let (_, value) = self
            .cached
            .get_or_insert_with(|| (key, (self.calc)(store)));
        value
    }
}
