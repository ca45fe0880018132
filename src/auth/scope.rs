//! Requested-scope modeling.

// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated scope list, kept in the order it was configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(Vec<String>);
impl ScopeSet {
	/// Builds a scope set from any iterator of scope strings.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut out = Vec::new();

		for scope in scopes {
			let scope = scope.into();

			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}
			if !out.contains(&scope) {
				out.push(scope);
			}
		}

		Ok(Self(out))
	}

	/// Parses a space-delimited scope string such as `openid profile email`.
	pub fn parse_delimited(raw: &str) -> Result<Self, ScopeValidationError> {
		Self::new(raw.split_whitespace())
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in configured order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited representation used for the `scope` request parameter.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ScopeSet> for Vec<String> {
	fn from(value: ScopeSet) -> Self {
		value.0
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
