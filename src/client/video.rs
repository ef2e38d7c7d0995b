//! Video identifiers and the metadata summary extracted from the video-detail endpoint.

// self
use crate::{_prelude::*, error::ConfigError, sign::ParamValue};

/// Identifies a video by numeric `aid` or by `bvid`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoRef {
	/// Numeric archive identifier.
	Aid(u64),
	/// Base58-style identifier (`BV...`).
	Bvid(String),
}
impl VideoRef {
	/// Picks an identifier from optional parts, preferring a non-zero `aid`.
	pub fn from_parts(aid: Option<u64>, bvid: Option<&str>) -> Result<Self, ConfigError> {
		match (aid.filter(|&v| v != 0), bvid.map(str::trim).filter(|v| !v.is_empty())) {
			(Some(aid), _) => Ok(Self::Aid(aid)),
			(None, Some(bvid)) => Ok(Self::Bvid(bvid.to_owned())),
			(None, None) => Err(ConfigError::MissingVideoId),
		}
	}

	/// Query parameter carrying this identifier.
	pub fn to_param(&self) -> (&'static str, ParamValue) {
		match self {
			Self::Aid(aid) => ("aid", ParamValue::UInt(*aid)),
			Self::Bvid(bvid) => ("bvid", ParamValue::Str(bvid.clone())),
		}
	}
}

/// Static metadata for one video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStatic {
	/// Numeric archive identifier.
	pub aid: u64,
	/// `BV...` identifier.
	pub bvid: String,
	/// Publication time as a Unix timestamp.
	pub pubdate: i64,
	/// Title.
	pub title: String,
	/// Description text.
	pub description: Option<String>,
	/// Tag names joined with `;`; `None` when the video carries no tags.
	pub tag: Option<String>,
	/// Cover image URL with every `http://` rewritten to the scheme-relative `//`.
	pub pic: Option<String>,
	/// Category identifier.
	pub type_id: Option<i64>,
	/// Uploader identifier.
	pub user_id: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct VideoDetail {
	#[serde(rename = "View")]
	view: VideoView,
	#[serde(rename = "Tags", default)]
	tags: Vec<VideoTag>,
}
impl From<VideoDetail> for VideoStatic {
	fn from(detail: VideoDetail) -> Self {
		let VideoDetail { view, tags } = detail;
		let tag = if tags.is_empty() {
			None
		} else {
			Some(tags.into_iter().map(|t| t.tag_name).collect::<Vec<_>>().join(";"))
		};
		let pic = view.pic.map(|pic| pic.replace("http://", "//"));

		Self {
			aid: view.aid,
			bvid: view.bvid,
			pubdate: view.pubdate,
			title: view.title,
			description: view.desc,
			tag,
			pic,
			type_id: view.tid,
			user_id: view.owner.map(|owner| owner.mid),
		}
	}
}

#[derive(Deserialize)]
struct VideoView {
	aid: u64,
	bvid: String,
	pubdate: i64,
	title: String,
	#[serde(default)]
	desc: Option<String>,
	#[serde(default)]
	pic: Option<String>,
	#[serde(default)]
	tid: Option<i64>,
	#[serde(default)]
	owner: Option<VideoOwner>,
}

#[derive(Deserialize)]
struct VideoOwner {
	mid: u64,
}

#[derive(Deserialize)]
struct VideoTag {
	tag_name: String,
}
