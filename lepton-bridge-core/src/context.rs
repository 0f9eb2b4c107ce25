use crate::foreign::ForeignEnv;
use crate::symbols::SymbolTable;

/// The attached environment together with its resolved symbols.
///
/// Passed by value into every component instead of living in global state.
/// Both halves are borrowed, so nothing built from a context can outlive the
/// runtime it talks to.
pub struct BridgeContext<'e, E: ForeignEnv + ?Sized> {
    env: &'e E,
    symbols: &'e SymbolTable,
}

impl<'e, E: ForeignEnv + ?Sized> BridgeContext<'e, E> {
    pub fn new(env: &'e E, symbols: &'e SymbolTable) -> Self {
        Self { env, symbols }
    }

    pub fn env(&self) -> &'e E {
        self.env
    }

    pub fn symbols(&self) -> &'e SymbolTable {
        self.symbols
    }
}

impl<E: ForeignEnv + ?Sized> Clone for BridgeContext<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ForeignEnv + ?Sized> Copy for BridgeContext<'_, E> {}
