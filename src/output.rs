//! Console rendering of groups, resources and templates.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use rg_azure::types::{GenericResource, ResourceGroup};

/// Fields every printed ARM object shares.
pub trait ArmItem {
    fn name(&self) -> &str;
    fn id(&self) -> &str;
    fn location(&self) -> &str;
    fn tags(&self) -> &HashMap<String, String>;
    fn provisioning_state(&self) -> Option<&str>;
}

impl ArmItem for ResourceGroup {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn location(&self) -> &str {
        &self.location
    }
    fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
    fn provisioning_state(&self) -> Option<&str> {
        ResourceGroup::provisioning_state(self)
    }
}

impl ArmItem for GenericResource {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn location(&self) -> &str {
        &self.location
    }
    fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
    fn provisioning_state(&self) -> Option<&str> {
        GenericResource::provisioning_state(self)
    }
}

/// Blank lines closing every block.
const SEPARATOR: &str = "\n\n\n";

/// `{a: 1, b: 2}` with keys sorted, `{}` when empty.
pub fn format_tags(tags: &HashMap<String, String>) -> String {
    let sorted: BTreeMap<&String, &String> = tags.iter().collect();
    let body = sorted
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

pub fn write_item<W: Write + ?Sized>(out: &mut W, item: &dyn ArmItem) -> io::Result<()> {
    writeln!(out, "\tName: {}", item.name())?;
    writeln!(out, "\tId: {}", item.id())?;
    writeln!(out, "\tLocation: {}", item.location())?;
    writeln!(out, "\tTags: {}", format_tags(item.tags()))?;
    if let Some(state) = item.provisioning_state().filter(|s| !s.is_empty()) {
        writeln!(out, "\tProperties:")?;
        writeln!(out, "\t\tProvisioning State: {state}")?;
    }
    write!(out, "{SEPARATOR}")
}

pub fn write_template<W: Write + ?Sized>(out: &mut W, template: &serde_json::Value) -> io::Result<()> {
    let pretty = serde_json::to_string_pretty(template).map_err(io::Error::other)?;
    writeln!(out, "{pretty}")?;
    write!(out, "{SEPARATOR}")
}

pub fn write_heading<W: Write + ?Sized>(out: &mut W, heading: &str) -> io::Result<()> {
    writeln!(out, "{heading}")
}
