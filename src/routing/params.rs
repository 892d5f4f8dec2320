/// Path parameters captured by a route, in capture order.
///
/// Named captures can be looked up by name or by position; unnamed ones
/// only by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(Option<String>, String)>,
}

impl Params {
    pub(crate) fn push(&mut self, name: Option<String>, value: String) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_deref(), v.as_str()))
    }
}
