//! Ticket fields and special field blocks.

use std::{collections::BTreeMap, fmt};

use serde::{
	Deserialize, Deserializer, Serialize,
	de::{self, MapAccess, SeqAccess, Visitor},
};

use crate::TicketSystem;

pub type FieldMap = BTreeMap<String, FieldValue>;

/// A field value: text, a list, or a nested mapping.
///
/// Scalars of any type (numbers, booleans) are read as text, `null` as empty text.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
	Text(String),
	List(Vec<FieldValue>),
	Map(FieldMap),
}

impl FieldValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldValue::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Rewrite every text leaf, recursing through lists and mappings. Keys are left untouched.
	pub fn map_text(&self, f: &mut impl FnMut(&str) -> String) -> FieldValue {
		match self {
			FieldValue::Text(text) => FieldValue::Text(f(text)),
			FieldValue::List(items) => FieldValue::List(items.iter().map(|item| item.map_text(f)).collect()),
			FieldValue::Map(map) => FieldValue::Map(map_text(map, f)),
		}
	}
}

/// [`FieldValue::map_text`] over a whole mapping.
pub fn map_text(fields: &FieldMap, f: &mut impl FnMut(&str) -> String) -> FieldMap {
	fields.iter().map(|(key, value)| (key.clone(), value.map_text(f))).collect()
}

/// Overlay `overlay` onto `base`. Same-named keys are replaced, not merged.
pub fn merge_into(base: &mut FieldMap, overlay: &FieldMap) {
	for (key, value) in overlay {
		base.insert(key.clone(), value.clone());
	}
}

impl From<&str> for FieldValue {
	fn from(text: &str) -> Self {
		FieldValue::Text(text.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(text: String) -> Self {
		FieldValue::Text(text)
	}
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
	fn from(items: Vec<T>) -> Self {
		FieldValue::List(items.into_iter().map(Into::into).collect())
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Text(text) => write!(f, "{text}"),
			FieldValue::List(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{item}")?;
				}
				write!(f, "]")
			}
			FieldValue::Map(map) => {
				write!(f, "{{")?;
				for (i, (key, value)) in map.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{key}: {value}")?;
				}
				write!(f, "}}")
			}
		}
	}
}

impl<'de> Deserialize<'de> for FieldValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(FieldValueVisitor)
	}
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
	type Value = FieldValue;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "a scalar, a list or a mapping")
	}

	fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v.to_string()))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v.to_string()))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v.to_string()))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v.to_string()))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v.to_string()))
	}

	fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(v))
	}

	fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(String::new()))
	}

	fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(FieldValue::Text(String::new()))
	}

	fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		FieldValue::deserialize(deserializer)
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
		let mut items = Vec::new();
		while let Some(item) = seq.next_element()? {
			items.push(item);
		}
		Ok(FieldValue::List(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
		let mut map = FieldMap::new();
		while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
			map.insert(key, value);
		}
		Ok(FieldValue::Map(map))
	}
}

/// Which render targets a [`FieldBlock`] applies to.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
pub enum FieldScope {
	#[display("tix")]
	Generic,
	#[display("{_0}")]
	System(TicketSystem),
}

impl FieldScope {
	pub const GENERIC_TAG: &'static str = "tix";

	/// Scope for a fenced block's language tag, if the tag is reserved. Matching is exact.
	pub fn from_tag(tag: &str) -> Option<Self> {
		if tag == Self::GENERIC_TAG {
			return Some(FieldScope::Generic);
		}
		TicketSystem::from_tag(tag).map(FieldScope::System)
	}

	/// Generic blocks apply everywhere; system blocks only to their own system.
	pub fn applies_to(&self, system: Option<TicketSystem>) -> bool {
		match self {
			FieldScope::Generic => true,
			FieldScope::System(scope) => system == Some(*scope),
		}
	}
}

/// A parsed special block.
#[derive(Clone, Debug, derive_new::new, Eq, PartialEq)]
pub struct FieldBlock {
	pub scope: FieldScope,
	pub fields: FieldMap,
}
