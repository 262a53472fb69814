//! Template entities and the forest they form.
//!
//! Templates live in an arena owned by [`TemplateForest`] and refer to each
//! other by [`TemplateId`]. The parent link is a lookup aid only; children
//! lists are the owning edges and are kept sorted by name.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::definition::TemplateDefinition;
use crate::error::{Result, TemplateError};
use crate::loader::LoadWarning;
use crate::value::{merge_deep, Settings};

/// Index of a template inside its forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(usize);

impl TemplateId {
    /// Position in the forest arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One image definition.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    dir: PathBuf,
    ami: Option<Settings>,
    base: Option<String>,
    variables: Settings,
    scripts: Vec<String>,
    execute_command: Option<String>,
    parent: Option<TemplateId>,
    children: Vec<TemplateId>,
}

impl Template {
    /// Create an empty template rooted at `dir`.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            ami: None,
            base: None,
            variables: Settings::new(),
            scripts: Vec::new(),
            execute_command: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Build a template from its parsed definition.
    ///
    /// Exactly one of `ami` and `base` must be declared.
    pub fn from_definition(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        definition: TemplateDefinition,
    ) -> std::result::Result<Self, LoadWarning> {
        let name = name.into();
        match (&definition.ami, &definition.base) {
            (Some(_), Some(_)) => return Err(LoadWarning::AmbiguousParent { name }),
            (None, None) => return Err(LoadWarning::MissingParent { name }),
            _ => {}
        }

        let mut template = Self::new(name, dir);
        template.ami = definition.ami;
        template.base = definition.base;
        template.variables = definition.variables.unwrap_or_default();
        template.scripts = definition.scripts.unwrap_or_default();
        template.execute_command = definition.execute;
        Ok(template)
    }

    pub fn with_ami(mut self, ami: Settings) -> Self {
        self.ami = Some(ami);
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_variables(mut self, variables: Settings) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_execute_command(mut self, command: impl Into<String>) -> Self {
        self.execute_command = Some(command.into());
        self
    }

    /// Overlay settings onto this template's own builder configuration,
    /// creating it if the template had none.
    pub fn overlay_settings(&mut self, settings: &Settings) {
        if settings.is_empty() {
            return;
        }
        let ami = self.ami.get_or_insert_with(Settings::new);
        for (key, value) in settings {
            ami.insert(key.clone(), value.clone());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the definition file and static inputs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Own builder configuration, without anything inherited.
    pub fn ami(&self) -> Option<&Settings> {
        self.ami.as_ref()
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Own variables, without anything inherited.
    pub fn own_variables(&self) -> &Settings {
        &self.variables
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Own `execute_command` override.
    pub fn own_execute_command(&self) -> Option<&str> {
        self.execute_command.as_deref()
    }

    pub fn parent(&self) -> Option<TemplateId> {
        self.parent
    }

    pub fn children(&self) -> &[TemplateId] {
        &self.children
    }

    /// Declares a base that did not resolve.
    pub fn is_orphan(&self) -> bool {
        self.base.is_some() && self.parent.is_none()
    }
}

/// All templates of one templates directory.
#[derive(Debug, Clone, Default)]
pub struct TemplateForest {
    templates: Vec<Template>,
}

impl TemplateForest {
    /// Resolve `base` references and build the forest.
    ///
    /// Links are established in input order. A base naming no template, or
    /// one that would close a cycle, leaves the template orphaned and yields
    /// a warning.
    pub fn link(templates: Vec<Template>) -> (Self, Vec<LoadWarning>) {
        let mut forest = Self { templates };
        let mut warnings = Vec::new();

        let by_name: HashMap<String, TemplateId> = forest
            .templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), TemplateId(i)))
            .collect();

        for index in 0..forest.templates.len() {
            let child = TemplateId(index);
            let Some(base) = forest.templates[index].base.clone() else {
                continue;
            };
            let name = forest.templates[index].name.clone();

            match by_name.get(&base).copied() {
                None => warnings.push(LoadWarning::UnknownBase { name, base }),
                Some(parent) if forest.reaches(parent, child) => {
                    warnings.push(LoadWarning::CyclicBase { name, base })
                }
                Some(parent) => {
                    forest.templates[index].parent = Some(parent);
                    forest.templates[parent.0].children.push(child);
                }
            }
        }

        for index in 0..forest.templates.len() {
            let mut children = std::mem::take(&mut forest.templates[index].children);
            children.sort_by(|a, b| forest.templates[a.0].name.cmp(&forest.templates[b.0].name));
            forest.templates[index].children = children;
        }

        (forest, warnings)
    }

    /// Whether walking up from `from` passes through `target`.
    fn reaches(&self, from: TemplateId, target: TemplateId) -> bool {
        let mut current = Some(from);
        while let Some(id) = current {
            if id == target {
                return true;
            }
            current = self.templates[id.0].parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template by id.
    ///
    /// Ids are only handed out by this forest, so indexing cannot fail.
    pub fn get(&self, id: TemplateId) -> &Template {
        &self.templates[id.0]
    }

    /// All templates, in load order.
    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Template)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId(i), t))
    }

    /// Any template by exact name, orphans included.
    pub fn lookup(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .position(|t| t.name == name)
            .map(TemplateId)
    }

    /// A buildable template by exact name.
    ///
    /// Orphans and their descendants are never returned.
    pub fn find(&self, name: &str) -> Option<TemplateId> {
        self.lookup(name).filter(|&id| self.is_rooted(id))
    }

    /// Like [`find`](Self::find), with a not-found error listing the
    /// resolvable names.
    pub fn require(&self, name: &str) -> Result<TemplateId> {
        self.find(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
            available: self.resolvable_names(),
        })
    }

    /// Whether the ancestor chain ends at a template without a base.
    pub fn is_rooted(&self, id: TemplateId) -> bool {
        let root = self.lineage(id)[0];
        self.templates[root.0].base.is_none()
    }

    /// Names [`find`](Self::find) resolves, sorted.
    pub fn resolvable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .iter()
            .filter(|(id, _)| self.is_rooted(*id))
            .map(|(_, t)| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Templates with no parent, sorted by name. Orphans are included.
    pub fn tops(&self) -> Vec<TemplateId> {
        let mut tops: Vec<TemplateId> = self
            .iter()
            .filter(|(_, t)| t.parent.is_none())
            .map(|(id, _)| id)
            .collect();
        tops.sort_by(|a, b| self.get(*a).name.cmp(&self.get(*b).name));
        tops
    }

    /// Ancestor chain from the top of the tree down to `id` itself.
    pub fn lineage(&self, id: TemplateId) -> Vec<TemplateId> {
        let mut chain = vec![id];
        let mut current = self.templates[id.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.templates[parent.0].parent;
        }
        chain.reverse();
        chain
    }

    /// `id` followed by its descendants, level by level.
    pub fn breadth_first(&self, id: TemplateId) -> Vec<TemplateId> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            order.push(next);
            queue.extend(self.templates[next.0].children.iter().copied());
        }
        order
    }

    /// Effective variables: every ancestor's merged top-down, nearest wins.
    ///
    /// The result is an independent copy.
    pub fn variables(&self, id: TemplateId) -> Settings {
        self.lineage(id)
            .into_iter()
            .fold(Settings::new(), |merged, ancestor| {
                merge_deep(&merged, &self.templates[ancestor.0].variables)
            })
    }

    /// Effective `execute_command`: own override, else the nearest ancestor's.
    pub fn execute_command(&self, id: TemplateId) -> Option<&str> {
        self.lineage(id)
            .into_iter()
            .rev()
            .find_map(|ancestor| self.templates[ancestor.0].execute_command.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn settings(pairs: &[(&str, Value)]) -> Settings {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn root(name: &str) -> Template {
        Template::new(name, format!("/templates/{name}"))
            .with_ami(settings(&[("region", "us-west-2".into())]))
    }

    fn based(name: &str, base: &str) -> Template {
        Template::new(name, format!("/templates/{name}")).with_base(base)
    }

    fn names(forest: &TemplateForest, ids: &[TemplateId]) -> Vec<String> {
        ids.iter().map(|id| forest.get(*id).name().to_string()).collect()
    }

    #[test]
    fn test_from_definition_requires_exactly_one_parent_kind() {
        let both = TemplateDefinition {
            ami: Some(Settings::new()),
            base: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(
            Template::from_definition("t", "/t", both),
            Err(LoadWarning::AmbiguousParent { .. })
        ));

        assert!(matches!(
            Template::from_definition("t", "/t", TemplateDefinition::default()),
            Err(LoadWarning::MissingParent { .. })
        ));

        let ok = TemplateDefinition {
            base: Some("x".into()),
            scripts: Some(vec!["a.sh".into()]),
            ..Default::default()
        };
        let template = Template::from_definition("t", "/t", ok).unwrap();
        assert_eq!(template.base(), Some("x"));
        assert_eq!(template.scripts(), ["a.sh"]);
        assert!(template.own_variables().is_empty());
    }

    #[test]
    fn test_overlay_creates_ami() {
        let mut template = based("app", "base-os");
        template.overlay_settings(&settings(&[("instance_type", "t3.micro".into())]));
        assert_eq!(template.ami().unwrap()["instance_type"], Value::from("t3.micro"));

        let mut template = based("app", "base-os");
        template.overlay_settings(&Settings::new());
        assert!(template.ami().is_none());
    }

    #[test]
    fn test_link_sorts_children() {
        let (forest, warnings) = TemplateForest::link(vec![
            based("zeta", "root"),
            root("root"),
            based("alpha", "root"),
            based("mid", "root"),
        ]);
        assert!(warnings.is_empty());

        let root = forest.find("root").unwrap();
        assert_eq!(names(&forest, forest.get(root).children()), ["alpha", "mid", "zeta"]);
        assert_eq!(forest.get(forest.find("alpha").unwrap()).parent(), Some(root));
    }

    #[test]
    fn test_unknown_base_is_orphaned() {
        let (forest, warnings) = TemplateForest::link(vec![
            root("root"),
            based("lost", "missing"),
            based("child-of-lost", "lost"),
        ]);

        assert!(matches!(&warnings[..], [LoadWarning::UnknownBase { name, .. }] if name == "lost"));
        assert!(forest.lookup("lost").is_some());
        assert!(forest.find("lost").is_none());
        assert!(forest.find("child-of-lost").is_none());
        assert!(forest.get(forest.lookup("lost").unwrap()).is_orphan());
        match forest.require("lost") {
            Err(TemplateError::NotFound { available, .. }) => assert_eq!(available, ["root"]),
            other => panic!("Expected NotFound, got {other:?}"),
        }
        assert_eq!(forest.resolvable_names(), ["root"]);
    }

    #[test]
    fn test_cycles_are_broken() {
        let (forest, warnings) = TemplateForest::link(vec![
            based("a", "b"),
            based("b", "a"),
            based("self", "self"),
        ]);

        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| matches!(w, LoadWarning::CyclicBase { .. })));
        // Bounded walks prove the forest stayed acyclic.
        for (id, _) in forest.iter() {
            assert!(forest.lineage(id).len() <= 2);
            assert!(!forest.is_rooted(id));
        }
    }

    #[test]
    fn test_breadth_first_order() {
        let (forest, _) = TemplateForest::link(vec![
            based("c", "a"),
            based("b", "root"),
            based("a", "root"),
            root("root"),
        ]);
        let order = forest.breadth_first(forest.find("root").unwrap());
        assert_eq!(names(&forest, &order), ["root", "a", "b", "c"]);

        let order = forest.breadth_first(forest.find("a").unwrap());
        assert_eq!(names(&forest, &order), ["a", "c"]);
    }

    #[test]
    fn test_lineage_runs_top_down() {
        let (forest, _) = TemplateForest::link(vec![root("root"), based("mid", "root"), based("leaf", "mid")]);
        let leaf = forest.find("leaf").unwrap();
        assert_eq!(names(&forest, &forest.lineage(leaf)), ["root", "mid", "leaf"]);
    }

    #[test]
    fn test_variables_merge_top_down() {
        let (forest, _) = TemplateForest::link(vec![
            root("root").with_variables(settings(&[
                ("user", "admin".into()),
                ("tags", settings(&[("os", "debian".into()), ("tier", "base".into())]).into()),
            ])),
            based("app", "root").with_variables(settings(&[
                ("port", Value::Integer(8080)),
                ("tags", settings(&[("tier", "app".into())]).into()),
            ])),
        ]);

        let vars = forest.variables(forest.find("app").unwrap());
        assert_eq!(vars["user"], Value::from("admin"));
        assert_eq!(vars["port"], Value::Integer(8080));
        let tags = vars["tags"].as_map().unwrap();
        assert_eq!(tags["os"], Value::from("debian"));
        assert_eq!(tags["tier"], Value::from("app"));
    }

    #[test]
    fn test_execute_command_inherits_nearest() {
        let (forest, _) = TemplateForest::link(vec![
            root("root").with_execute_command("sh '{{ .Path }}'"),
            based("mid", "root"),
            based("leaf", "mid").with_execute_command("sudo sh '{{ .Path }}'"),
            root("plain"),
        ]);

        assert_eq!(forest.execute_command(forest.find("mid").unwrap()), Some("sh '{{ .Path }}'"));
        assert_eq!(
            forest.execute_command(forest.find("leaf").unwrap()),
            Some("sudo sh '{{ .Path }}'")
        );
        assert_eq!(forest.execute_command(forest.find("plain").unwrap()), None);
    }

    #[test]
    fn test_tops_include_orphans() {
        let (forest, _) = TemplateForest::link(vec![root("b"), based("a", "nowhere"), based("c", "b")]);
        assert_eq!(names(&forest, &forest.tops()), ["a", "b"]);
    }
}
