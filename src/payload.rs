//! What the model-data endpoint sends back, and how a raw body is classified.
//!
//! The server answers `GET /get_model_data/{id}` with one of two JSON shapes:
//!
//! * an image reference: `{"type": "image", "filename": "part.png"}`
//! * mesh arrays: `{"vertices": [[x,y,z], ..], "faces": [[a,b,c], ..],
//!   "surface_types": [..], "center": [x,y,z], "size": [w,h,d]}`
//!
//! Anything else is rejected as [`PreviewError::MalformedPayload`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::PreviewError;

/// Mesh arrays plus the bounding box the server computed for them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshPayload {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    /// One category label per face group (planar, cylindrical, ...).
    #[serde(default, alias = "surfaceTypes")]
    pub surface_types: Vec<String>,
    pub center: [f32; 3],
    pub size: [f32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewPayload {
    Image { filename: String },
    Mesh(MeshPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Image,
    Mesh,
}

impl PreviewPayload {
    /// Parse and classify a response body.
    pub fn from_json(body: &str) -> Result<Self, PreviewError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| PreviewError::malformed(format!("response is not JSON ({e})")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PreviewError> {
        let Some(fields) = value.as_object() else {
            return Err(PreviewError::malformed("expected a JSON object"));
        };

        let non_empty = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_array)
                .is_some_and(|a| !a.is_empty())
        };

        if non_empty("vertices") && non_empty("faces") {
            let mesh: MeshPayload = serde_json::from_value(value)
                .map_err(|e| PreviewError::malformed(format!("bad mesh arrays ({e})")))?;
            return Ok(Self::Mesh(mesh));
        }

        match fields.get("filename").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => Ok(Self::Image { filename: name.to_owned() }),
            _ if fields.get("type").and_then(Value::as_str) == Some("image") => {
                Err(PreviewError::malformed("image payload without a filename"))
            }
            _ => Err(PreviewError::malformed("payload is neither an image nor a mesh")),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Image { .. } => PayloadKind::Image,
            Self::Mesh(_) => PayloadKind::Mesh,
        }
    }
}

/// Pull the `error` text out of a failed response body, if the server sent one.
pub fn server_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_only_is_an_image() {
        let p = PreviewPayload::from_json(r#"{"type": "image", "filename": "part.png"}"#).unwrap();
        assert_eq!(p, PreviewPayload::Image { filename: "part.png".into() });

        let p = PreviewPayload::from_json(r#"{"filename": "scan.jpg"}"#).unwrap();
        assert_eq!(p.kind(), PayloadKind::Image);
    }

    #[test]
    fn vertices_and_faces_make_a_mesh() {
        let body = r#"{
            "vertices": [[0,0,0],[1,0,0],[0,1,0]],
            "faces": [[0,1,2]],
            "surface_types": ["planar"],
            "center": [0.33, 0.33, 0],
            "size": [1, 1, 0]
        }"#;
        let PreviewPayload::Mesh(mesh) = PreviewPayload::from_json(body).unwrap() else {
            panic!("expected a mesh");
        };
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.surface_types, vec!["planar".to_string()]);
        assert_eq!(mesh.size, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn camel_case_surface_types_are_accepted() {
        let body = r#"{"vertices": [[0,0,0]], "faces": [[0,0,0]],
            "surfaceTypes": ["cylindrical"], "center": [0,0,0], "size": [1,1,1]}"#;
        let PreviewPayload::Mesh(mesh) = PreviewPayload::from_json(body).unwrap() else {
            panic!("expected a mesh");
        };
        assert_eq!(mesh.surface_types, vec!["cylindrical".to_string()]);
    }

    #[test]
    fn mesh_wins_over_filename() {
        let body = r#"{"filename": "part.step", "vertices": [[0,0,0]], "faces": [[0,0,0]],
            "center": [0,0,0], "size": [1,1,1]}"#;
        assert_eq!(PreviewPayload::from_json(body).unwrap().kind(), PayloadKind::Mesh);
    }

    #[test]
    fn neither_shape_is_malformed() {
        for body in [
            r#"{}"#,
            r#"{"vertices": [], "faces": []}"#,
            r#"{"vertices": [[0,0,0]]}"#,
            r#"{"type": "image"}"#,
            r#"{"filename": "   "}"#,
            r#"[1, 2, 3]"#,
            r#"not json"#,
        ] {
            let err = PreviewPayload::from_json(body).unwrap_err();
            assert!(matches!(err, PreviewError::MalformedPayload(_)), "{body}: {err:?}");
        }
    }

    #[test]
    fn mesh_missing_bounds_is_malformed() {
        let body = r#"{"vertices": [[0,0,0]], "faces": [[0,0,0]]}"#;
        assert!(matches!(
            PreviewPayload::from_json(body),
            Err(PreviewError::MalformedPayload(_))
        ));
    }

    #[test]
    fn negative_face_index_is_malformed() {
        let body = r#"{"vertices": [[0,0,0]], "faces": [[0,-1,0]], "center": [0,0,0], "size": [1,1,1]}"#;
        assert!(matches!(
            PreviewPayload::from_json(body),
            Err(PreviewError::MalformedPayload(_))
        ));
    }

    #[test]
    fn server_error_text_is_extracted() {
        assert_eq!(
            server_error_message(r#"{"error": "Order not found"}"#).as_deref(),
            Some("Order not found")
        );
        assert_eq!(server_error_message("<html>oops</html>"), None);
    }
}
