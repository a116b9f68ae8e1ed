use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Pages table - content-managed pages addressed by slug
#[derive(Iden)]
pub enum Pages {
    Table,
    Id,
    Slug,
    Title,
    Status,
    Seo,
    PublishAtMs,
    Blocks,
    CreatedAtMs,
    UpdatedAtMs,
}

/// Site settings table - single row holding navbar/footer chrome
#[derive(Iden)]
pub enum SiteSettings {
    Table,
    Id,
    Settings,
    UpdatedAtMs,
}

/// Users table - mirrored from the identity provider
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    Role,
    CreatedAtMs,
}

#[derive(Iden)]
pub enum Categories {
    Table,
    Id,
    Slug,
    Name,
}

#[derive(Iden)]
pub enum Venues {
    Table,
    Id,
    Name,
    Address,
    City,
}

#[derive(Iden)]
pub enum InstructorProfiles {
    Table,
    Id,
    UserId,
    DisplayName,
    Bio,
    AvatarUrl,
    Specialties,
}

/// Classes table - a craft class offered by one instructor at one venue
#[derive(Iden)]
pub enum Classes {
    Table,
    Id,
    Title,
    Description,
    CategoryId,
    InstructorId,
    VenueId,
    PriceCents,
    MinAge,
    MaxAge,
    ImageUrl,
    IsPublished,
}

/// Class schedules table - dated sessions of a class with seat counts
#[derive(Iden)]
pub enum ClassSchedules {
    Table,
    Id,
    ClassId,
    StartsAtMs,
    EndsAtMs,
    SeatsTotal,
    SeatsRemaining,
}

/// Bookings table - one seat on one schedule for one parent
#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    Reference,
    ScheduleId,
    ParentId,
    Status,
    AmountCents,
    PaymentReference,
    CreatedAtMs,
    UpdatedAtMs,
}
