/// Box in pixel corner coordinates, as produced by a detection model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Box in the normalized center/size form used by YOLO label files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> Self {
        Self {
            x1: xc - w / 2.,
            y1: yc - h / 2.,
            x2: xc + w / 2.,
            y2: yc + h / 2.,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.) * self.height().max(0.)
    }

    pub fn intersection(&self, other: &PixelBox) -> f32 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        w.max(0.) * h.max(0.)
    }

    pub fn union(&self, other: &PixelBox) -> f32 {
        self.area() + other.area() - self.intersection(other)
    }

    pub fn iou(&self, other: &PixelBox) -> f32 {
        let union = self.union(other);
        if union <= 0. {
            return 0.;
        }
        self.intersection(other) / union
    }

    /// Clips the corners into `[0, width] x [0, height]`.
    pub fn clamp(&self, image_width: u32, image_height: u32) -> Self {
        let w = image_width as f32;
        let h = image_height as f32;
        Self {
            x1: self.x1.clamp(0., w),
            y1: self.y1.clamp(0., h),
            x2: self.x2.clamp(0., w),
            y2: self.y2.clamp(0., h),
        }
    }

    pub fn to_yolo(&self, image_width: u32, image_height: u32) -> YoloBox {
        let w = image_width as f32;
        let h = image_height as f32;
        YoloBox {
            center_x: (self.x1 + self.x2) / 2. / w,
            center_y: (self.y1 + self.y2) / 2. / h,
            width: (self.x2 - self.x1) / w,
            height: (self.y2 - self.y1) / h,
        }
    }
}

impl YoloBox {
    pub fn to_pixel(&self, image_width: u32, image_height: u32) -> PixelBox {
        let w = image_width as f32;
        let h = image_height as f32;
        PixelBox::from_center(
            self.center_x * w,
            self.center_y * h,
            self.width * w,
            self.height * h,
        )
    }

    pub fn is_normalized(&self) -> bool {
        [self.center_x, self.center_y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}
