//! Scalar parameter values accepted by the signer.

// self
use crate::_prelude::*;

/// Error returned when a value has no canonical string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ParamValueError {
	/// Composite or null values cannot be placed in a query string.
	#[error("{kind} values have no canonical form")]
	Unsupported {
		/// JSON kind that was rejected.
		kind: &'static str,
	},
	/// NaN and infinities cannot be placed in a query string.
	#[error("non-finite numbers have no canonical form")]
	NonFinite,
}

/// Scalar request parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
	/// Signed integer.
	Int(i64),
	/// Unsigned integer.
	UInt(u64),
	/// Finite floating point number.
	Float(f64),
	/// Boolean, rendered as `true`/`false`.
	Bool(bool),
	/// Text.
	Str(String),
}
impl ParamValue {
	/// Renders the value as it appears before sanitization and percent-encoding.
	pub fn canonical(&self) -> Result<String, ParamValueError> {
		match self {
			Self::Int(v) => Ok(v.to_string()),
			Self::UInt(v) => Ok(v.to_string()),
			Self::Float(v) if v.is_finite() => Ok(v.to_string()),
			Self::Float(_) => Err(ParamValueError::NonFinite),
			Self::Bool(v) => Ok(v.to_string()),
			Self::Str(v) => Ok(v.clone()),
		}
	}
}

/// Conversion into a [`ParamValue`], failing for values without a canonical form.
pub trait IntoParamValue {
	/// Performs the conversion.
	fn into_param_value(self) -> Result<ParamValue, ParamValueError>;
}
impl IntoParamValue for ParamValue {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(self)
	}
}
impl IntoParamValue for &ParamValue {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(self.clone())
	}
}
impl IntoParamValue for bool {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(ParamValue::Bool(self))
	}
}
impl IntoParamValue for f64 {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		if self.is_finite() { Ok(ParamValue::Float(self)) } else { Err(ParamValueError::NonFinite) }
	}
}
impl IntoParamValue for f32 {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		f64::from(self).into_param_value()
	}
}
impl IntoParamValue for String {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(ParamValue::Str(self))
	}
}
impl IntoParamValue for &String {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(ParamValue::Str(self.clone()))
	}
}
impl IntoParamValue for &str {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		Ok(ParamValue::Str(self.to_owned()))
	}
}
impl IntoParamValue for serde_json::Value {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		(&self).into_param_value()
	}
}
impl IntoParamValue for &serde_json::Value {
	fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
		use serde_json::Value;

		match self {
			Value::Bool(v) => Ok(ParamValue::Bool(*v)),
			Value::String(v) => Ok(ParamValue::Str(v.clone())),
			Value::Number(n) =>
				if let Some(v) = n.as_u64() {
					Ok(ParamValue::UInt(v))
				} else if let Some(v) = n.as_i64() {
					Ok(ParamValue::Int(v))
				} else {
					n.as_f64().ok_or(ParamValueError::NonFinite)?.into_param_value()
				},
			Value::Null => Err(ParamValueError::Unsupported { kind: "null" }),
			Value::Array(_) => Err(ParamValueError::Unsupported { kind: "array" }),
			Value::Object(_) => Err(ParamValueError::Unsupported { kind: "object" }),
		}
	}
}

macro_rules! impl_signed {
	($($ty:ty),*) => {
		$(
			impl IntoParamValue for $ty {
				fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
					Ok(ParamValue::Int(i64::from(self)))
				}
			}
		)*
	};
}
macro_rules! impl_unsigned {
	($($ty:ty),*) => {
		$(
			impl IntoParamValue for $ty {
				fn into_param_value(self) -> Result<ParamValue, ParamValueError> {
					Ok(ParamValue::UInt(u64::from(self)))
				}
			}
		)*
	};
}

impl_signed!(i8, i16, i32, i64);
impl_unsigned!(u8, u16, u32, u64);
