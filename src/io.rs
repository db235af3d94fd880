use nalgebra::Vector2;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use crate::diagnostics::DiagnosticReport;
use crate::domain::mesh2d::Mesh2D;

const CLOSING_TAGS: &str = "    </Grid>\n  </Domain>\n</Xdmf>\n";

/// Time series of a vertex velocity field in XDMF 2 with inline XML data.
///
/// Topology and geometry are stored once at domain level; every time step
/// references them by XPath. Each [`XdmfWriter::write`] overwrites the closing
/// tags with the new step followed by the closing tags again, so the file is
/// complete after every snapshot and earlier steps are never rewritten.
#[derive(Debug)]
pub struct XdmfWriter {
    path: PathBuf,
    tail: u64, // byte offset of the closing tags
    num_vertices: usize,
    num_snapshots: usize,
}

impl XdmfWriter {
    /// Creates the parent directory and writes the mesh with an empty time series.
    pub fn new(path: impl Into<PathBuf>, mesh: &Mesh2D) -> Result<Self, io::Error> {
        let path = path.into();
        if let Some(parent_dir) = path.parent() {
            fs::create_dir_all(parent_dir)?;
            info!("Ensured output directory exists: {}", parent_dir.display());
        }

        let mut header = String::new();
        header.push_str("<?xml version=\"1.0\"?>\n");
        header.push_str("<!DOCTYPE Xdmf SYSTEM \"Xdmf.dtd\" []>\n");
        header.push_str("<Xdmf Version=\"2.0\">\n  <Domain>\n");
        header.push_str(&format!(
            "    <Topology Name=\"mesh_topology\" TopologyType=\"Triangle\" \
             NumberOfElements=\"{}\" NodesPerElement=\"3\">\n",
            mesh.num_cells()
        ));
        header.push_str(&format!(
            "      <DataItem Dimensions=\"{} 3\" NumberType=\"Int\" Format=\"XML\">\n",
            mesh.num_cells()
        ));
        for cell in mesh.cells() {
            header.push_str(&format!("        {} {} {}\n", cell[0], cell[1], cell[2]));
        }
        header.push_str("      </DataItem>\n    </Topology>\n");
        header.push_str("    <Geometry Name=\"mesh_geometry\" GeometryType=\"XY\">\n");
        header.push_str(&format!(
            "      <DataItem Dimensions=\"{} 2\" Format=\"XML\">\n",
            mesh.num_vertices()
        ));
        for v in mesh.vertices() {
            header.push_str(&format!("        {:e} {:e}\n", v.x, v.y));
        }
        header.push_str("      </DataItem>\n    </Geometry>\n");
        header.push_str("    <Grid Name=\"TimeSeries_u\" GridType=\"Collection\" ");
        header.push_str("CollectionType=\"Temporal\">\n");

        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(header.as_bytes())?;
        writer.write_all(CLOSING_TAGS.as_bytes())?;
        writer.flush()?;

        Ok(Self {
            path,
            tail: header.len() as u64,
            num_vertices: mesh.num_vertices(),
            num_snapshots: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_snapshots(&self) -> usize {
        self.num_snapshots
    }

    /// Appends a snapshot of one velocity per mesh vertex.
    pub fn write(&mut self, time: f64, values: &[Vector2<f64>]) -> Result<(), io::Error> {
        if values.len() != self.num_vertices {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Expected {} vertex values, got {}", self.num_vertices, values.len()),
            ));
        }

        let mut step = String::with_capacity(values.len() * 48 + 640);
        step.push_str("      <Grid Name=\"mesh\" GridType=\"Uniform\">\n");
        step.push_str("        <Topology Reference=\"XML\">");
        step.push_str("/Xdmf/Domain/Topology[@Name=\"mesh_topology\"]</Topology>\n");
        step.push_str("        <Geometry Reference=\"XML\">");
        step.push_str("/Xdmf/Domain/Geometry[@Name=\"mesh_geometry\"]</Geometry>\n");
        step.push_str(&format!("        <Time Value=\"{}\" />\n", time));
        step.push_str("        <Attribute Name=\"u\" AttributeType=\"Vector\" Center=\"Node\">\n");
        step.push_str(&format!(
            "          <DataItem Dimensions=\"{} 3\" Format=\"XML\">\n",
            self.num_vertices
        ));
        for u in values {
            // z component is zero; viewers expect 3-vectors
            step.push_str(&format!("            {:e} {:e} 0\n", u.x, u.y));
        }
        step.push_str("          </DataItem>\n        </Attribute>\n      </Grid>\n");

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(self.tail))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(step.as_bytes())?;
        writer.write_all(CLOSING_TAGS.as_bytes())?;
        writer.flush()?;

        self.tail += step.len() as u64;
        self.num_snapshots += 1;
        Ok(())
    }
}

/// Appends the report line to `path`, creating the file if needed.
pub fn append_result(path: impl AsRef<Path>, report: &DiagnosticReport) -> Result<(), io::Error> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", report)
}
