//! Capabilities document.

use quick_xml::events::BytesStart;

use super::encode::{empty, end, finish, new_writer, start, EncodeError};
use crate::indexer::Capabilities;

/// Render `<caps>` for a (possibly merged) set of capabilities.
pub fn caps_xml(title: &str, caps: &Capabilities) -> Result<String, EncodeError> {
    let mut writer = new_writer()?;
    start(&mut writer, BytesStart::new("caps"))?;

    let mut server = BytesStart::new("server");
    server.push_attribute(("version", env!("CARGO_PKG_VERSION")));
    server.push_attribute(("title", title));
    empty(&mut writer, server)?;

    let mut limits = BytesStart::new("limits");
    limits.push_attribute(("max", caps.limits.max.to_string().as_str()));
    limits.push_attribute(("default", caps.limits.default.to_string().as_str()));
    empty(&mut writer, limits)?;

    start(&mut writer, BytesStart::new("searching"))?;
    for mode in &caps.search_modes {
        let mut elem = BytesStart::new(mode.key.caps_element());
        elem.push_attribute(("available", if mode.available { "yes" } else { "no" }));
        elem.push_attribute(("supportedParams", mode.supported_params.join(",").as_str()));
        empty(&mut writer, elem)?;
    }
    end(&mut writer, "searching")?;

    start(&mut writer, BytesStart::new("categories"))?;
    for category in &caps.categories {
        let mut elem = BytesStart::new("category");
        elem.push_attribute(("id", category.id.to_string().as_str()));
        elem.push_attribute(("name", category.name.as_str()));
        empty(&mut writer, elem)?;
    }
    end(&mut writer, "categories")?;

    end(&mut writer, "caps")?;
    finish(writer)
}
