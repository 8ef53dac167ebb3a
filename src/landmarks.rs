use crate::types::Shape;

/// Named landmark groups attached to an image, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkGroups {
    groups: Vec<(String, Shape)>,
}

impl LandmarkGroups {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Attach `shape` under `name`. An existing group with the same name is
    /// replaced in place; otherwise the group is appended.
    pub fn insert(&mut self, name: impl Into<String>, shape: Shape) {
        let name = name.into();
        match self.groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = shape,
            None => self.groups.push((name, shape)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Shape> {
        let idx = self.groups.iter().position(|(n, _)| n == name)?;
        Some(self.groups.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Shape)> {
        self.groups.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(n, _)| n.as_str())
    }

    /// Groups whose name matches a glob `pattern` (`*` matches any run of
    /// characters, `?` exactly one).
    pub fn items_matching<'a>(
        &'a self,
        pattern: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Shape)> + 'a {
        self.iter().filter(move |(name, _)| glob_match(pattern, name))
    }

    /// Apply `f` to every point of every group.
    pub fn map_points<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut crate::types::Point),
    {
        for (_, shape) in self.groups.iter_mut() {
            for p in shape.points.iter_mut() {
                f(p);
            }
        }
    }
}

/// Glob matching over characters with `*` and `?` wildcards.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = name.chars().collect();

    let (mut pi, mut si) = (0usize, 0usize);
    // Position of the last '*' in the pattern and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, si));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            si = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
