use std::fmt;

/// Nominal tag describing the shape of data exchanged between modules.
///
/// Interface types form an explicit single-inheritance hierarchy: every type
/// records its direct supertype, and compatibility is decided by walking the
/// ancestor chain. Declare them as `static` items so modules can hold
/// `&'static InterfaceType` references:
///
/// ```
/// use modflow::core::InterfaceType;
///
/// static SIGNAL: InterfaceType = InterfaceType::root("Signal");
/// static STEREO: InterfaceType = InterfaceType::extends("StereoSignal", &SIGNAL);
///
/// assert!(STEREO.is_subtype_of(&SIGNAL));
/// assert!(!SIGNAL.is_subtype_of(&STEREO));
/// ```
///
/// Identity is the `static` item itself: two statics with the same name are
/// still unrelated types.
pub struct InterfaceType {
    name: &'static str,
    parent: Option<&'static InterfaceType>,
}

impl InterfaceType {
    /// A type with no supertype
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A type whose direct supertype is `parent`
    pub const fn extends(name: &'static str, parent: &'static InterfaceType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static InterfaceType> {
        self.parent
    }

    /// This type followed by each of its supertypes, nearest first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Reflexive subtype check: every type is a subtype of itself.
    pub fn is_subtype_of(&self, other: &InterfaceType) -> bool {
        self.ancestors().any(|ancestor| ancestor == other)
    }
}

impl PartialEq for InterfaceType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for InterfaceType {}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .finish()
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a InterfaceType>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a InterfaceType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}
