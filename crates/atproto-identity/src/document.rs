//! Plain data carriers for a resolved DID document. These are deliberately
//! inert: they hold what a resolver returned and nothing here interprets it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
	pub id: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub also_known_as: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub verification_method: Vec<VerificationMethod>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub service: Vec<Service>,
}

impl DidDocument {
	/// A document with nothing but an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			also_known_as: Vec::new(),
			verification_method: Vec::new(),
			service: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub service_endpoint: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub controller: String,
	/// Usually a multikey, ie a did:key without the `did:key:` prefix.
	#[serde(
		default,
		alias = "publicKeyMultiBase",
		skip_serializing_if = "Option::is_none"
	)]
	pub public_key_multibase: Option<String>,
}
