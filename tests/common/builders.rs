//! Test data builders for creating test objects

use vispipe::dataset::{AttributeRole, MemoryDataset};
use vispipe::pipeline::{NodeId, Pipeline};

/// Builder for creating test datasets
pub struct DatasetBuilder {
    dataset: MemoryDataset,
    tuples: usize,
}

impl DatasetBuilder {
    pub fn new(type_name: &str) -> Self {
        Self {
            dataset: MemoryDataset::new(type_name),
            tuples: 4,
        }
    }

    pub fn tuples(mut self, tuples: usize) -> Self {
        self.tuples = tuples;
        self
    }

    pub fn point(self, name: &str, components: usize) -> Self {
        self.array(AttributeRole::Point, name, components)
    }

    pub fn cell(self, name: &str, components: usize) -> Self {
        self.array(AttributeRole::Cell, name, components)
    }

    fn array(mut self, role: AttributeRole, name: &str, components: usize) -> Self {
        let values = (0..self.tuples * components)
            .map(|i| i as f64 * 0.25 + name.len() as f64)
            .collect();
        self.dataset = self.dataset.with_array(role, name, components, values);
        self
    }

    pub fn build(self) -> MemoryDataset {
        self.dataset
    }
}

/// The two-scalar grid used throughout the data source tests.
pub fn weather_grid() -> MemoryDataset {
    DatasetBuilder::new("UnstructuredGrid")
        .point("temperature", 1)
        .point("pressure", 1)
        .build()
}

/// A dataset with one array of every kind on both tables.
pub fn full_grid() -> MemoryDataset {
    DatasetBuilder::new("StructuredGrid")
        .point("temperature", 1)
        .point("velocity", 3)
        .point("stress", 9)
        .cell("material", 1)
        .cell("flux", 3)
        .cell("strain", 4)
        .build()
}

/// Scene with one data source holding `data`.
pub fn scene_with_data(pipeline: &mut Pipeline, data: MemoryDataset) -> (NodeId, NodeId) {
    let scene = pipeline.create_scene("scene");
    let source = pipeline
        .create_data_source(Some(Box::new(data)))
        .expect("data source");
    pipeline.add_child(scene, source).expect("attach source");
    (scene, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vispipe::dataset::Dataset;

    #[test]
    fn test_dataset_builder() {
        let ds = DatasetBuilder::new("PolyData").tuples(2).point("v", 3).build();
        assert_eq!(ds.type_name(), "PolyData");
        assert_eq!(ds.array(AttributeRole::Point, "v").unwrap().values.len(), 6);
    }
}
