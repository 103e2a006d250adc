//! Template library: the known objects as feature clouds.

use std::fmt;

use tracing::{error, info, warn};

use objrec_core::{Error, FeatureCloud, FeatureEstimator, PointCloud, Result};

/// Supplies the raw template geometry, one `(name, points)` pair per object.
///
/// Implementations report an inaccessible corpus as
/// `Error::InputUnavailable`.
pub trait TemplateSource {
    fn load_templates(&self) -> Result<Vec<(String, PointCloud)>>;
}

/// Templates already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    templates: Vec<(String, PointCloud)>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: impl Into<String>, cloud: PointCloud) -> Self {
        self.templates.push((name.into(), cloud));
        self
    }
}

impl TemplateSource for InMemorySource {
    fn load_templates(&self) -> Result<Vec<(String, PointCloud)>> {
        Ok(self.templates.clone())
    }
}

impl TemplateSource for Vec<(String, PointCloud)> {
    fn load_templates(&self) -> Result<Vec<(String, PointCloud)>> {
        Ok(self.clone())
    }
}

/// Position in the library plus the template's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateId {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    id: TemplateId,
    features: FeatureCloud,
}

impl Template {
    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn features(&self) -> &FeatureCloud {
        &self.features
    }

    pub fn cloud(&self) -> &PointCloud {
        self.features.cloud()
    }
}

/// Read-only after construction; share it by reference across threads.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap precomputed feature clouds. Empty ones are skipped.
    pub fn from_feature_clouds(entries: impl IntoIterator<Item = (String, FeatureCloud)>) -> Self {
        let mut library = Self::new();
        for (name, features) in entries {
            library.push(name, features);
        }
        library
    }

    /// Load every template from `source` and compute its descriptors.
    ///
    /// Fails only when the source itself fails; templates whose descriptors
    /// cannot be computed are skipped with a warning.
    pub fn load(source: &dyn TemplateSource, estimator: &dyn FeatureEstimator) -> Result<Self> {
        let raw = source.load_templates().map_err(|e| match e {
            Error::InputUnavailable(msg) => Error::InputUnavailable(msg),
            other => Error::InputUnavailable(other.to_string()),
        })?;

        let mut library = Self::new();
        for (name, cloud) in raw {
            info!(template = %name, points = cloud.len(), "loading template");
            match estimator.compute_feature_cloud(cloud) {
                Ok(features) => library.push(name, features),
                Err(e) => warn!(template = %name, error = %e, "skipping template, descriptors failed"),
            }
        }
        info!(templates = library.len(), "template library ready");
        Ok(library)
    }

    /// Like [`TemplateLibrary::load`], but an unavailable corpus is logged
    /// and yields an empty library that never matches.
    pub fn load_or_empty(source: &dyn TemplateSource, estimator: &dyn FeatureEstimator) -> Self {
        Self::load(source, estimator).unwrap_or_else(|e| {
            error!(error = %e, "template corpus unavailable, library is empty");
            Self::new()
        })
    }

    fn push(&mut self, name: String, features: FeatureCloud) {
        if features.is_empty() {
            warn!(template = %name, "skipping template without described points");
            return;
        }
        let id = TemplateId {
            index: self.templates.len(),
            name,
        };
        self.templates.push(Template { id, features });
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use objrec_core::Descriptor;

    struct Coordinates;

    impl FeatureEstimator for Coordinates {
        fn compute_feature_cloud(&self, cloud: PointCloud) -> Result<FeatureCloud> {
            if cloud.len() == 1 {
                return Err(Error::AlgorithmError("single point".into()));
            }
            let d = cloud.points.iter().map(|p| Descriptor::new(vec![p.x, p.y, p.z])).collect();
            FeatureCloud::new(cloud, d)
        }
    }

    struct Unavailable;

    impl TemplateSource for Unavailable {
        fn load_templates(&self) -> Result<Vec<(String, PointCloud)>> {
            Err(Error::input_unavailable("/no/such/folder"))
        }
    }

    fn cloud(n: usize) -> PointCloud {
        PointCloud::new((0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect())
    }

    #[test]
    fn load_assigns_ids_and_skips_bad_templates() {
        let source = InMemorySource::new()
            .with_template("mug", cloud(10))
            .with_template("single", cloud(1))
            .with_template("empty", PointCloud::default())
            .with_template("can", cloud(5));
        let library = TemplateLibrary::load(&source, &Coordinates).unwrap();
        assert_eq!(library.len(), 2);
        let names: Vec<&str> = library.iter().map(Template::name).collect();
        assert_eq!(names, vec!["mug", "can"]);
        assert_eq!(library.get(1).unwrap().id().index, 1);
        assert_eq!(library.get(1).unwrap().cloud().len(), 5);
        assert_eq!(library.get(0).unwrap().id().to_string(), "mug#0");
    }

    #[test]
    fn unavailable_corpus_is_a_hard_error_or_an_empty_library() {
        let err = TemplateLibrary::load(&Unavailable, &Coordinates).unwrap_err();
        assert!(matches!(err, Error::InputUnavailable(_)));
        assert!(TemplateLibrary::load_or_empty(&Unavailable, &Coordinates).is_empty());
    }

    #[test]
    fn vec_is_a_template_source() {
        let source = vec![("box".to_string(), cloud(3))];
        let library = TemplateLibrary::load(&source, &Coordinates).unwrap();
        assert_eq!(library.len(), 1);
    }
}
