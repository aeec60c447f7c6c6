use nalgebra_glm as glm;

/// Stack of 4x4 transforms. The top is always the effective composed
/// transform; every composing call right-multiplies it in place.
pub struct MatrixStack {
    stack: Vec<glm::Mat4>,
}

impl MatrixStack {
    pub fn new() -> Self {
        MatrixStack {
            stack: vec![glm::Mat4::identity()],
        }
    }

    pub fn push(&mut self) {
        let top = *self.top();
        self.stack.push(top);
    }

    pub fn pop(&mut self) {
        assert!(
            self.stack.len() > 1,
            "MatrixStack::pop would remove the last frame"
        );
        self.stack.pop();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn top(&self) -> &glm::Mat4 {
        // Never empty: pop refuses to remove the last frame
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut glm::Mat4 {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn load_identity(&mut self) {
        *self.top_mut() = glm::Mat4::identity();
    }

    pub fn translate(&mut self, v: &glm::Vec3) {
        let top = self.top_mut();
        *top = glm::translate(top, v);
    }

    pub fn scale(&mut self, v: &glm::Vec3) {
        let top = self.top_mut();
        *top = glm::scale(top, v);
    }

    /// `angle` is in radians, `axis` does not need to be normalized.
    pub fn rotate(&mut self, angle: f32, axis: &glm::Vec3) {
        let top = self.top_mut();
        *top = glm::rotate(top, angle, axis);
    }

    pub fn multiply(&mut self, m: &glm::Mat4) {
        let top = self.top_mut();
        *top = *top * m;
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}
