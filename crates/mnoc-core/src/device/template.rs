//! Junos VLAN configuration template

use handlebars::Handlebars;
use serde::Serialize;
use tracing::warn;

use super::{DeviceError, DeviceResult};
use crate::models::{DeviceVlan, VlanRecord, DEFAULT_VLAN_NAME, DEFAULT_VLAN_TAG};
use crate::util::non_blank_str;

const TEMPLATE_NAME: &str = "vlans";

// `replace:` swaps the whole vlans stanza when loaded with action="replace",
// so the default VLAN has to be part of every render.
const VLANS_TEMPLATE: &str = "replace: vlans {
{{#each vlans}}
    {{name}} {
        vlan-id {{tag}};
{{#if description}}
        description {{description}};
{{/if}}
    }
{{/each}}
}
";

#[derive(Serialize)]
struct TemplateContext<'a> {
    vlans: Vec<TemplateVlan<'a>>,
}

#[derive(Serialize)]
struct TemplateVlan<'a> {
    name: &'a str,
    tag: u16,
    description: Option<&'a str>,
}

/// Renders the text-format `vlans` stanza pushed to Junos devices.
#[derive(Clone)]
pub struct VlanConfigTemplate {
    handlebars: Handlebars<'static>,
}

impl VlanConfigTemplate {
    pub fn new() -> DeviceResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(junos_quote);
        handlebars
            .register_template_string(TEMPLATE_NAME, VLANS_TEMPLATE)
            .map_err(|e| DeviceError::Template(e.to_string()))?;
        Ok(Self { handlebars })
    }

    /// Render `vlans` after the reserved default VLAN. Input entries that
    /// collide with the default's tag or name are dropped.
    pub fn render(&self, vlans: &[DeviceVlan]) -> DeviceResult<String> {
        let default = TemplateVlan {
            name: DEFAULT_VLAN_NAME,
            tag: DEFAULT_VLAN_TAG,
            description: None,
        };
        let (kept, dropped) = split_default_collisions(vlans);
        for vlan in dropped {
            warn!(
                name = vlan.name(),
                tag = vlan.tag(),
                "Dropping VLAN that collides with the default VLAN from device config"
            );
        }

        let context = TemplateContext {
            vlans: std::iter::once(default)
                .chain(kept.into_iter().map(|vlan| TemplateVlan {
                    name: vlan.name(),
                    tag: vlan.tag(),
                    description: non_blank_str(vlan.description()),
                }))
                .collect(),
        };

        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| DeviceError::Template(e.to_string()))
    }
}

fn collides_with_default(vlan: &DeviceVlan) -> bool {
    vlan.tag() == DEFAULT_VLAN_TAG || vlan.name() == DEFAULT_VLAN_NAME
}

/// Split `vlans` into renderable entries and those clashing with the default VLAN.
fn split_default_collisions(vlans: &[DeviceVlan]) -> (Vec<&DeviceVlan>, Vec<&DeviceVlan>) {
    vlans.iter().partition(|vlan| !collides_with_default(vlan))
}

/// Quote a value for Junos text configuration unless it is a bare word.
fn junos_quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':'));
    if bare {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
