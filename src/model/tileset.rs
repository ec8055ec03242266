use crate::conversion::converter::CoordinateConverter;
use crate::error::Result;
use crate::indexing::node::GridNode;
use crate::model::options::RefineMode;
use crate::model::vector3::Vector3;
use serde::{Deserialize, Serialize};

pub const TILESET_VERSION: &str = "1.0";
pub const CONTENT_FILE: &str = "content.pnts";
pub const TILESET_FILE: &str = "tileset.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Asset {
	pub version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
	pub uri: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoundingVolume {
	/// `[west, south, east, north, minHeight, maxHeight]`
	pub region: [f64; 6],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Child {
	pub content: Content,
	pub bounding_volume: BoundingVolume,
	pub geometric_error: f64,
	pub refine: RefineMode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Root {
	pub content: Content,
	pub bounding_volume: BoundingVolume,
	pub geometric_error: f64,
	pub refine: RefineMode,
	pub children: Vec<Child>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
	pub asset: Asset,
	pub geometric_error: f64,
	pub root: Root,
}

impl Tileset {
	/// Manifest for `node`: its own content plus one entry per child that
	/// holds points. Leaf children are referenced by their content, internal
	/// ones by their own manifest.
	pub fn create(
		node: &GridNode,
		converter: &dyn CoordinateConverter,
		offset: &Vector3,
		refine: RefineMode,
	) -> Result<Tileset> {
		let geometric_error = node.compute_geometric_error(converter, offset)?;
		let region = node.get_bounding_box_region(converter, offset)?;

		let mut children = Vec::new();
		if let Some(nodes) = node.children() {
			for (index, child) in nodes.iter().enumerate() {
				if child.num_points() == 0 {
					continue;
				}
				let file = if child.is_leaf() { CONTENT_FILE } else { TILESET_FILE };
				children.push(Child {
					content: Content {
						uri: format!("{}/{}", index, file),
					},
					bounding_volume: BoundingVolume {
						region: child.get_bounding_box_region(converter, offset)?,
					},
					geometric_error: child.compute_geometric_error(converter, offset)?,
					refine,
				});
			}
		}

		Ok(Tileset {
			asset: Asset {
				version: TILESET_VERSION.to_string(),
			},
			geometric_error,
			root: Root {
				content: Content {
					uri: CONTENT_FILE.to_string(),
				},
				bounding_volume: BoundingVolume { region },
				geometric_error,
				refine,
				children,
			},
		})
	}
}
