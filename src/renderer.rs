use glow::{Context, HasContext as _};
use nalgebra::Matrix4;

use crate::error::PreviewError;
use crate::geometry::MeshGeometry;
use crate::palette::Rgb;

/// Direction *towards* the key light, world space.
const LIGHT_DIR: [f32; 3] = [0.577, 0.577, 0.577];

const VERTEX_SHADER: &str = r#"
    precision highp float;
    uniform mat4 u_mvp;
    in vec3 a_pos;
    in vec3 a_normal;
    out vec3 v_normal;
    void main() {
        v_normal    = a_normal;
        gl_Position = u_mvp * vec4(a_pos, 1.0);
    }"#;

const FRAGMENT_SHADER: &str = r#"
    precision mediump float;
    uniform vec3 u_color;
    uniform vec3 u_light;
    in  vec3 v_normal;
    out vec4 o_col;
    void main() {
        float diffuse = max(dot(normalize(v_normal), u_light), 0.0);
        o_col = vec4(u_color * (0.35 + 0.65 * diffuse), 1.0);
    }"#;

#[derive(Debug, Clone, Copy)]
struct DrawRange {
    color: Rgb,
    /// Byte offset into the element buffer.
    offset: i32,
    count: i32,
}

/// One indexed triangle mesh, drawn in one call per material group.
pub struct GpuMesh {
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    u_mvp: glow::UniformLocation,
    u_color: glow::UniformLocation,
    u_light: glow::UniformLocation,
    ranges: Vec<DrawRange>,
}

unsafe impl Send for GpuMesh {}
unsafe impl Sync for GpuMesh {}

impl GpuMesh {
    pub unsafe fn new(gl: &Context) -> Result<Self, PreviewError> {
        unsafe {
            let version = egui_glow::ShaderVersion::get(gl).version_declaration();
            let vs = compile(gl, glow::VERTEX_SHADER, &format!("{version}\n{VERTEX_SHADER}"))?;
            let fs = match compile(gl, glow::FRAGMENT_SHADER, &format!("{version}\n{FRAGMENT_SHADER}")) {
                Ok(fs) => fs,
                Err(e) => {
                    gl.delete_shader(vs);
                    return Err(e);
                }
            };

            let program = match gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    gl.delete_shader(vs);
                    gl.delete_shader(fs);
                    return Err(PreviewError::render(e));
                }
            };
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.bind_attrib_location(program, 0, "a_pos");
            gl.bind_attrib_location(program, 1, "a_normal");
            gl.link_program(program);
            gl.detach_shader(program, vs);
            gl.detach_shader(program, fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(PreviewError::render(format!("shader link failed: {log}")));
            }

            let uniform = |name: &str| {
                gl.get_uniform_location(program, name)
                    .ok_or_else(|| PreviewError::render(format!("uniform {name} missing")))
            };
            let uniforms = uniform("u_mvp")
                .and_then(|mvp| Ok((mvp, uniform("u_color")?, uniform("u_light")?)));
            let (u_mvp, u_color, u_light) = match uniforms {
                Ok(found) => found,
                Err(e) => {
                    gl.delete_program(program);
                    return Err(e);
                }
            };

            let vao = gl.create_vertex_array().map_err(PreviewError::render)?;
            let vbo = gl.create_buffer().map_err(PreviewError::render)?;
            let ebo = gl.create_buffer().map_err(PreviewError::render)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            // 6 floats per vertex: xyz normal
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 24, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 24, 12);
            gl.bind_vertex_array(None);

            Ok(Self { program, vao, vbo, ebo, u_mvp, u_color, u_light, ranges: Vec::new() })
        }
    }

    pub unsafe fn upload(&mut self, gl: &Context, geometry: &MeshGeometry) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&geometry.interleaved()),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&geometry.indices),
                glow::STATIC_DRAW,
            );
            gl.bind_vertex_array(None);
        }

        self.ranges = geometry
            .groups
            .iter()
            .filter(|g| g.count > 0)
            .map(|g| DrawRange {
                color: g.color,
                offset: (g.start * std::mem::size_of::<u32>()) as i32,
                count: g.count as i32,
            })
            .collect();
    }

    pub unsafe fn paint(&self, gl: &Context, mvp: Matrix4<f32>) {
        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.clear(glow::DEPTH_BUFFER_BIT);

            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(Some(&self.u_mvp), false, mvp.as_slice());
            let [lx, ly, lz] = LIGHT_DIR;
            gl.uniform_3_f32(Some(&self.u_light), lx, ly, lz);
            gl.bind_vertex_array(Some(self.vao));
            for range in &self.ranges {
                let [r, g, b] = range.color;
                gl.uniform_3_f32(Some(&self.u_color), r, g, b);
                gl.draw_elements(glow::TRIANGLES, range.count, glow::UNSIGNED_INT, range.offset);
            }
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
        }
    }

    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_buffer(self.ebo);
        }
    }
}

unsafe fn compile(gl: &Context, kind: u32, source: &str) -> Result<glow::Shader, PreviewError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(PreviewError::render)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            Err(PreviewError::render(format!("shader compile failed: {log}")))
        }
    }
}
