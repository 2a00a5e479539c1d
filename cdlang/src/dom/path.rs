//! gNMI paths.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dom::param::{quote, Param};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathElem {
    /// Empty when the whole element is matched by a variable or wildcard.
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub key: BTreeMap<String, Param>,
    /// Direct params of a nameless element.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl PathElem {
    pub fn named(name: impl Into<String>) -> PathElem {
        PathElem {
            name: name.into(),
            ..PathElem::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, value: Param) -> PathElem {
        self.key.insert(key.into(), value);
        self
    }

    pub fn unnamed(param: Param) -> PathElem {
        PathElem {
            params: vec![param],
            ..PathElem::default()
        }
    }

    /// The direct params plus every variable used as a key value.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        let keys = self.key.values().filter(|param| param.is_variable());
        self.params.iter().chain(keys)
    }

    fn to_textproto(&self, out: &mut String) {
        out.push_str("elem { name: ");
        match self.name.as_str() {
            "" => match self.params.first() {
                Some(param) if param.is_variable() => out.push_str(&param.render()),
                _ => out.push_str("\"\""),
            },
            name => out.push_str(&quote(name)),
        }
        for (key, value) in &self.key {
            out.push_str(" key { key: ");
            out.push_str(&quote(key));
            out.push_str(" value: ");
            out.push_str(&value.render());
            out.push_str(" }");
        }
        out.push_str(" }");
    }
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name)?;
        for (key, value) in &self.key {
            write!(f, "[{key}={value}]")?;
        }
        Ok(())
    }
}

/// An ordered list of path elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GnmiPath(pub Vec<PathElem>);

impl GnmiPath {
    pub fn elems(&self) -> &[PathElem] {
        &self.0
    }

    /// The textual form used to key coverage records, for example
    /// `/interfaces/interface[name="*"]/state`.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// The elements in protocol-buffer text format, without the enclosing
    /// field name.
    pub fn to_textproto(&self) -> String {
        let mut out = String::new();
        for (index, elem) in self.0.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            elem.to_textproto(&mut out);
        }
        out
    }

    /// Every param mentioned by the path, in element order.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.0.iter().flat_map(PathElem::params)
    }
}

impl fmt::Display for GnmiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        self.0.iter().try_for_each(|elem| write!(f, "{elem}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::param::STRING_TYPE;

    fn interface_path(name: Param) -> GnmiPath {
        GnmiPath(vec![
            PathElem::named("interfaces"),
            PathElem::named("interface").with_key("name", name),
            PathElem::named("state"),
        ])
    }

    #[test]
    fn render_keys() {
        let path = interface_path(Param::string_constant("*"));
        assert_eq!(path.render(), r#"/interfaces/interface[name="*"]/state"#);

        let path = interface_path(Param::variable("ifname", STRING_TYPE));
        assert_eq!(path.render(), r#"/interfaces/interface[name="$ifname"]/state"#);
    }

    #[test]
    fn render_unnamed_and_empty() {
        let path = GnmiPath(vec![PathElem::unnamed(Param::ignored())]);
        assert_eq!(path.render(), "/");
        assert_eq!(GnmiPath::default().render(), "/");
    }

    #[test]
    fn params_include_variable_keys_only() {
        let elem = PathElem::named("interface")
            .with_key("name", Param::variable_decl("ifname", STRING_TYPE))
            .with_key("type", Param::other_constant("ETH"));
        let names = elem.params().map(|param| param.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["ifname"]);

        let elem = PathElem::unnamed(Param::variable("rest", STRING_TYPE));
        assert_eq!(elem.params().count(), 1);
    }

    #[test]
    fn textproto() {
        let path = interface_path(Param::variable("ifname", STRING_TYPE));
        assert_eq!(
            path.to_textproto(),
            r#"elem { name: "interfaces" } elem { name: "interface" key { key: "name" value: "$ifname" } } elem { name: "state" }"#,
        );
    }
}
