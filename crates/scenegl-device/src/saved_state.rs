//! GL state save / restore around render-to-texture passes.

use gl::types::{GLenum, GLint, GLuint};

/// GL state a nested pass may disturb, captured so it can be put back.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedGlState {
    draw_framebuffer: GLint,
    read_framebuffer: GLint,
    draw_buffer: GLint,
    read_buffer: GLint,
    texture_2d: GLint,
    texture_cube: GLint,
    active_texture: GLint,
    program: GLint,
    vao: GLint,
    viewport: [GLint; 4],
    blend: bool,
}

impl SavedGlState {
    /// # Safety
    ///
    /// A GL context must be current.
    pub(crate) unsafe fn save() -> Self {
        let mut s = Self {
            draw_framebuffer: 0,
            read_framebuffer: 0,
            draw_buffer: 0,
            read_buffer: 0,
            texture_2d: 0,
            texture_cube: 0,
            active_texture: 0,
            program: 0,
            vao: 0,
            viewport: [0; 4],
            blend: false,
        };
        gl::GetIntegerv(gl::DRAW_FRAMEBUFFER_BINDING, &mut s.draw_framebuffer);
        gl::GetIntegerv(gl::READ_FRAMEBUFFER_BINDING, &mut s.read_framebuffer);
        gl::GetIntegerv(gl::DRAW_BUFFER, &mut s.draw_buffer);
        gl::GetIntegerv(gl::READ_BUFFER, &mut s.read_buffer);
        gl::GetIntegerv(gl::TEXTURE_BINDING_2D, &mut s.texture_2d);
        gl::GetIntegerv(gl::TEXTURE_BINDING_CUBE_MAP, &mut s.texture_cube);
        gl::GetIntegerv(gl::ACTIVE_TEXTURE, &mut s.active_texture);
        gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut s.program);
        gl::GetIntegerv(gl::VERTEX_ARRAY_BINDING, &mut s.vao);
        gl::GetIntegerv(gl::VIEWPORT, s.viewport.as_mut_ptr());
        s.blend = gl::IsEnabled(gl::BLEND) == gl::TRUE;
        s
    }

    /// # Safety
    ///
    /// A GL context must be current and every saved object must still exist.
    pub(crate) unsafe fn restore(&self) {
        gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, self.draw_framebuffer as GLuint);
        gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.read_framebuffer as GLuint);
        // Buffer selection is per framebuffer, so it goes back after the bind.
        gl::DrawBuffer(self.draw_buffer as GLenum);
        gl::ReadBuffer(self.read_buffer as GLenum);
        gl::ActiveTexture(self.active_texture as GLenum);
        gl::BindTexture(gl::TEXTURE_2D, self.texture_2d as GLuint);
        gl::BindTexture(gl::TEXTURE_CUBE_MAP, self.texture_cube as GLuint);
        gl::UseProgram(self.program as GLuint);
        gl::BindVertexArray(self.vao as GLuint);
        gl::Viewport(
            self.viewport[0],
            self.viewport[1],
            self.viewport[2],
            self.viewport[3],
        );
        if self.blend {
            gl::Enable(gl::BLEND);
        } else {
            gl::Disable(gl::BLEND);
        }
    }
}
